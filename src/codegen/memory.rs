//! Linear-memory layout
//!
//! Offsets `0..sizeof(usize)` hold the null sentinel, the next word the
//! heap-start pointer; user segments follow, each aligned to 8 bytes (the
//! manager knows no per-type alignment, so it picks the strictest).

use super::{Compiler, MAX_MEMORY_PAGES, PAGE_SIZE};
use crate::backend::MemorySegment;
use crate::types::Target;

impl<'a> Compiler<'a> {
    /// Allocate a segment for `bytes` at the next aligned offset.
    pub(crate) fn add_memory_segment(&mut self, bytes: Vec<u8>) -> MemorySegment {
        let offset = (self.memory_offset + 7) & !7;
        let segment = MemorySegment { bytes, offset };
        self.memory_offset = offset + segment.bytes.len() as u64;
        self.memory_segments.push(segment.clone());
        segment
    }

    /// Write the heap-start pointer, round the used range up to whole
    /// pages and publish the memory declaration.
    pub(crate) fn finalize_memory(&mut self) {
        let target = self.options.target;
        let ptr_size = target.usize_size() as u64;
        if target == Target::Wasm32 && self.memory_offset > u32::MAX as u64 {
            panic!(
                "memory offset {} does not fit the 32-bit address space",
                self.memory_offset
            );
        }
        let bytes = match target {
            Target::Wasm32 => (self.memory_offset as u32).to_le_bytes().to_vec(),
            Target::Wasm64 => self.memory_offset.to_le_bytes().to_vec(),
        };
        let mut segments = std::mem::take(&mut self.memory_segments);
        segments.insert(
            0,
            MemorySegment {
                bytes,
                offset: ptr_size,
            },
        );
        let initial_pages = ((self.memory_offset + PAGE_SIZE - 1) / PAGE_SIZE).max(1) as u32;
        self.module
            .set_memory(initial_pages, MAX_MEMORY_PAGES, segments, Some("memory"));
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Compiler, Options};
    use crate::program::Program;

    #[test]
    fn segments_are_eight_byte_aligned() {
        let program = Program::new(Vec::new());
        let mut compiler = Compiler::new(&program, Options::default());
        let first = compiler.add_memory_segment(vec![1, 2, 3]);
        let second = compiler.add_memory_segment(vec![4]);
        assert_eq!(first.offset, 8);
        assert_eq!(second.offset, 16);
        assert_eq!(compiler.memory_offset, 17);
    }

    #[test]
    #[should_panic(expected = "32-bit address space")]
    fn overflowing_a_32_bit_target_is_fatal() {
        let program = Program::new(Vec::new());
        let mut compiler = Compiler::new(&program, Options::default());
        compiler.memory_offset = u32::MAX as u64 + 1;
        compiler.finalize_memory();
    }

    #[test]
    fn heap_start_pointer_records_used_bytes() {
        let program = Program::new(Vec::new());
        let mut compiler = Compiler::new(&program, Options::default());
        compiler.add_memory_segment(vec![0; 5]);
        let used = compiler.memory_offset;
        compiler.finalize_memory();
        let module = compiler.module;
        let memory = module.memory().expect("memory must be declared");
        assert_eq!(memory.initial_pages, 1);
        let heap = &memory.segments[0];
        assert_eq!(heap.offset, 4);
        assert_eq!(heap.bytes, (used as u32).to_le_bytes().to_vec());
    }
}
