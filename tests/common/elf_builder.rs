//! Minimal ELF writer for loader tests, 32- or 64-bit, either byte order.
//!
//! Layout: file header, program header table, segment bytes, string tables,
//! symbol table, section header table.

pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;
pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;

const SHT_PROGBITS: u64 = 1;
const SHT_SYMTAB: u64 = 2;
const SHT_STRTAB: u64 = 3;

#[derive(Debug, Clone)]
pub struct SegmentSpec {
    pub p_type: u32,
    pub vaddr: u64,
    pub paddr: u64,
    pub memsz: u64,
    pub flags: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ElfBuilder {
    class64: bool,
    big_endian: bool,
    entry: u64,
    segments: Vec<SegmentSpec>,
    sections: Vec<(String, u64)>,
    symbols: Vec<(String, u64, u16)>,
    with_symtab: bool,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self {
            class64: false,
            big_endian: false,
            entry: 0,
            segments: Vec::new(),
            sections: Vec::new(),
            symbols: Vec::new(),
            with_symtab: true,
        }
    }

    pub fn class64(mut self) -> Self {
        self.class64 = true;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    pub fn segment(mut self, segment: SegmentSpec) -> Self {
        self.segments.push(segment);
        self
    }

    /// A `PT_LOAD` segment whose memory size equals its file size.
    pub fn load(self, paddr: u64, vaddr: u64, flags: u32, data: &[u8]) -> Self {
        self.segment(SegmentSpec {
            p_type: PT_LOAD,
            vaddr,
            paddr,
            memsz: data.len() as u64,
            flags,
            data: data.to_vec(),
        })
    }

    /// A named `SHT_PROGBITS` section header at `addr` (no contents).
    pub fn section(mut self, name: &str, addr: u64) -> Self {
        self.sections.push((name.to_string(), addr));
        self
    }

    /// A symbol; `shndx == 0` makes it undefined.
    pub fn symbol(mut self, name: &str, value: u64, shndx: u16) -> Self {
        self.symbols.push((name.to_string(), value, shndx));
        self
    }

    pub fn without_symtab(mut self) -> Self {
        self.with_symtab = false;
        self
    }

    /// Encode `value` in `width` bytes with the configured byte order.
    fn bytes(&self, value: u64, width: usize) -> Vec<u8> {
        if self.big_endian {
            value.to_be_bytes()[8 - width..].to_vec()
        } else {
            value.to_le_bytes()[..width].to_vec()
        }
    }

    fn put(&self, out: &mut [u8], at: usize, value: u64, width: usize) {
        out[at..at + width].copy_from_slice(&self.bytes(value, width));
    }

    /// Address-sized field width.
    fn word(&self) -> usize {
        if self.class64 {
            8
        } else {
            4
        }
    }

    fn header_size(&self) -> usize {
        if self.class64 {
            64
        } else {
            52
        }
    }

    fn phdr_size(&self) -> usize {
        if self.class64 {
            56
        } else {
            32
        }
    }

    fn shdr_size(&self) -> usize {
        if self.class64 {
            64
        } else {
            40
        }
    }

    fn sym_size(&self) -> usize {
        if self.class64 {
            24
        } else {
            16
        }
    }

    /// Write consecutive fields starting at `at`.
    fn put_fields(&self, out: &mut [u8], at: usize, fields: &[(u64, usize)]) {
        let mut pos = at;
        for &(value, width) in fields {
            self.put(out, pos, value, width);
            pos += width;
        }
    }

    fn symbol_entry(&self, name: u32, value: u64, shndx: u16) -> Vec<u8> {
        let mut entry = vec![0u8; self.sym_size()];
        let info = 0x12; // STB_GLOBAL, STT_FUNC
        if self.class64 {
            self.put_fields(&mut entry, 0, &[(name as u64, 4), (info, 1), (0, 1), (shndx as u64, 2), (value, 8)]);
        } else {
            self.put_fields(&mut entry, 0, &[(name as u64, 4), (value, 4), (0, 4), (info, 1), (0, 1), (shndx as u64, 2)]);
        }
        entry
    }

    pub fn build(&self) -> Vec<u8> {
        let word = self.word();
        let phoff = self.header_size();
        let mut out = vec![0u8; phoff + self.segments.len() * self.phdr_size()];

        out[0..4].copy_from_slice(b"\x7fELF");
        out[4] = if self.class64 { 2 } else { 1 };
        out[5] = if self.big_endian { 2 } else { 1 };
        out[6] = 1;
        self.put_fields(
            &mut out,
            16,
            &[
                (2, 2), // ET_EXEC
                (40, 2), // EM_ARM
                (1, 4),
                (self.entry, word),
                (phoff as u64, word),
            ],
        );

        for (i, seg) in self.segments.iter().enumerate() {
            let offset = out.len() as u64;
            out.extend_from_slice(&seg.data);
            let at = phoff + i * self.phdr_size();
            let filesz = seg.data.len() as u64;
            if self.class64 {
                self.put_fields(
                    &mut out,
                    at,
                    &[
                        (seg.p_type as u64, 4),
                        (seg.flags as u64, 4),
                        (offset, 8),
                        (seg.vaddr, 8),
                        (seg.paddr, 8),
                        (filesz, 8),
                        (seg.memsz, 8),
                        (4, 8),
                    ],
                );
            } else {
                self.put_fields(
                    &mut out,
                    at,
                    &[
                        (seg.p_type as u64, 4),
                        (offset, 4),
                        (seg.vaddr, 4),
                        (seg.paddr, 4),
                        (filesz, 4),
                        (seg.memsz, 4),
                        (seg.flags as u64, 4),
                        (4, 4),
                    ],
                );
            }
        }

        fn add_name(table: &mut Vec<u8>, name: &str) -> u64 {
            let offset = table.len() as u64;
            table.extend_from_slice(name.as_bytes());
            table.push(0);
            offset
        }

        // name, type, flags, addr, offset, size, link, info, addralign, entsize
        let mut headers: Vec<[u64; 10]> = vec![[0; 10]];
        let mut shstrtab = vec![0u8];

        for (name, addr) in &self.sections {
            let name = add_name(&mut shstrtab, name);
            headers.push([name, SHT_PROGBITS, 6, *addr, 0, 0, 0, 0, 4, 0]);
        }

        if self.with_symtab {
            let mut strtab = vec![0u8];
            let mut symtab = vec![0u8; self.sym_size()];
            for (name, value, shndx) in &self.symbols {
                let name = add_name(&mut strtab, name) as u32;
                symtab.extend_from_slice(&self.symbol_entry(name, *value, *shndx));
            }

            let strtab_offset = out.len() as u64;
            out.extend_from_slice(&strtab);
            while out.len() % word != 0 {
                out.push(0);
            }
            let symtab_offset = out.len() as u64;
            out.extend_from_slice(&symtab);

            let strtab_index = headers.len() as u64;
            let strtab_name = add_name(&mut shstrtab, ".strtab");
            headers.push([
                strtab_name,
                SHT_STRTAB,
                0,
                0,
                strtab_offset,
                strtab.len() as u64,
                0,
                0,
                1,
                0,
            ]);
            let symtab_name = add_name(&mut shstrtab, ".symtab");
            headers.push([
                symtab_name,
                SHT_SYMTAB,
                0,
                0,
                symtab_offset,
                symtab.len() as u64,
                strtab_index,
                1,
                word as u64,
                self.sym_size() as u64,
            ]);
        }

        let shstrndx = headers.len() as u64;
        let shstrtab_name = add_name(&mut shstrtab, ".shstrtab");
        let shstrtab_offset = out.len() as u64;
        out.extend_from_slice(&shstrtab);
        headers.push([
            shstrtab_name,
            SHT_STRTAB,
            0,
            0,
            shstrtab_offset,
            shstrtab.len() as u64,
            0,
            0,
            1,
            0,
        ]);

        while out.len() % word != 0 {
            out.push(0);
        }
        let shoff = out.len();
        out.resize(shoff + headers.len() * self.shdr_size(), 0);
        // sh_flags, sh_addr, sh_offset, sh_size, sh_addralign, sh_entsize are address-sized
        let widths = [4, 4, word, word, word, word, 4, 4, word, word];
        for (i, header) in headers.iter().enumerate() {
            let fields: Vec<(u64, usize)> = header.iter().copied().zip(widths).collect();
            self.put_fields(&mut out, shoff + i * self.shdr_size(), &fields);
        }

        // e_shoff, then e_ehsize .. e_shstrndx
        let shoff_at = if self.class64 { 40 } else { 32 };
        self.put(&mut out, shoff_at, shoff as u64, word);
        let tail_at = shoff_at + word + 4;
        self.put_fields(
            &mut out,
            tail_at,
            &[
                (phoff as u64, 2),
                (self.phdr_size() as u64, 2),
                (self.segments.len() as u64, 2),
                (self.shdr_size() as u64, 2),
                (headers.len() as u64, 2),
                (shstrndx, 2),
            ],
        );
        out
    }
}
