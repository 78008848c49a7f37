use std::rc::Rc;

use crate::error::Span;
use crate::interpreter::GeneratorPort;
use crate::reference::{Reference, ValueRef};

/// A handle to a live frame in the arena.
/// The generation distinguishes a reused slot from the frame that used to live there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    index: usize,
    generation: u32,
}

impl FrameId {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Storage for one active call
pub struct Frame {
    pub locals: Vec<ValueRef>,
    pub captures: Vec<Reference>,
    pub parent: Option<FrameId>,
    pub call_site: Option<Span>,
    /// Set when this frame runs a generator body
    pub generator: Option<Rc<GeneratorPort>>,
}

impl Frame {
    pub fn new(locals: Vec<ValueRef>, captures: Vec<Reference>) -> Self {
        Self {
            locals,
            captures,
            parent: None,
            call_site: None,
            generator: None,
        }
    }

    pub fn with_parent(mut self, parent: FrameId, call_site: Span) -> Self {
        self.parent = Some(parent);
        self.call_site = Some(call_site);
        self
    }
}

struct Slot {
    generation: u32,
    frame: Option<Frame>,
}

/// Arena of frames addressed by `FrameId`; released slots are reused.
pub struct FrameArena {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    live: usize,
}

impl FrameArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    pub fn alloc(&mut self, frame: Frame) -> FrameId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.frame = Some(frame);
            FrameId { index, generation: slot.generation }
        } else {
            let index = self.slots.len();
            self.slots.push(Slot { generation: 0, frame: Some(frame) });
            FrameId { index, generation: 0 }
        }
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_ref())
    }

    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_mut())
    }

    /// Free the frame. Its references live on wherever they were captured.
    pub fn release(&mut self, id: FrameId) -> Option<Frame> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let frame = slot.frame.take()?;
        self.free_list.push(id.index);
        self.live -= 1;
        Some(frame)
    }

    /// Number of frames currently alive.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Call depth of `id`, counting parent links.
    pub fn depth(&self, id: FrameId) -> usize {
        let mut depth = 0;
        let mut current = Some(id);
        while let Some(frame) = current.and_then(|id| self.get(id)) {
            depth += 1;
            current = frame.parent;
        }
        depth
    }
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn released_ids_go_stale() {
        let mut arena = FrameArena::new();
        let first = arena.alloc(Frame::new(Vec::new(), Vec::new()));
        assert!(arena.release(first).is_some());
        let second = arena.alloc(Frame::new(Vec::new(), Vec::new()));
        assert_eq!(first.index(), second.index());
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
        assert!(arena.release(first).is_none());
        assert_eq!(arena.live(), 1);
    }

    #[test]
    fn references_outlive_their_frame() {
        let mut arena = FrameArena::new();
        let slot = ValueRef::new(Value::Undefined);
        let id = arena.alloc(Frame::new(vec![slot.clone()], Vec::new()));
        let captured = arena.get(id).map(|f| f.locals[0].clone());
        arena.release(id);
        assert!(captured.map(|c| c.ptr_eq(&slot)).unwrap_or(false));
    }

    #[test]
    fn depth_follows_parents() {
        let mut arena = FrameArena::new();
        let root = arena.alloc(Frame::new(Vec::new(), Vec::new()));
        let child = arena.alloc(Frame::new(Vec::new(), Vec::new()).with_parent(root, Span::default()));
        assert_eq!(arena.depth(child), 2);
        arena.release(root);
        assert_eq!(arena.depth(child), 1);
    }
}
