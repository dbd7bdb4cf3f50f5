use rustc_hash::FxHashMap;

use crate::object::{Class, Closure, Instance, Obj, Upvalue};
use crate::table::hash_str;
use crate::value::{ObjRef, Value};

const GC_HEAP_GROW_FACTOR: usize = 2;
const INITIAL_GC_THRESHOLD: usize = 1 << 20; // 1 MiB of accounted allocation

struct GcBox {
    marked: bool,
    obj: Obj,
}

/// The object arena plus the tri-color mark-and-sweep collector over it.
///
/// Objects never move once allocated; a freed slot's index goes on a free
/// list and is reused by the next allocation, so `ObjRef`s handed out before
/// a collection stay valid for any object that survives it.
pub struct Heap {
    objects: Vec<Option<GcBox>>,
    free_slots: Vec<usize>,
    strings: FxHashMap<String, ObjRef>, // interning table, keyed on content
    gray_stack: Vec<ObjRef>,
    bytes_allocated: usize,
    next_gc: usize,
    pub log_gc: bool,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            objects: Vec::new(),
            free_slots: Vec::new(),
            strings: FxHashMap::default(),
            gray_stack: Vec::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_GC_THRESHOLD,
            log_gc: false,
        }
    }

    pub fn should_collect(&self) -> bool {
        self.bytes_allocated > self.next_gc
    }

    fn account(&mut self, obj: &Obj) {
        self.bytes_allocated += obj_size(obj);
    }

    pub fn alloc(&mut self, obj: Obj) -> ObjRef {
        self.account(&obj);
        if let Some(idx) = self.free_slots.pop() {
            self.objects[idx] = Some(GcBox { marked: false, obj });
            ObjRef(idx)
        } else {
            self.objects.push(Some(GcBox { marked: false, obj }));
            ObjRef(self.objects.len() - 1)
        }
    }

    /// Interns `s`, returning the existing `ObjRef` if an identical string
    /// was already allocated. Interning is what makes `Value::equals` on
    /// strings a cheap `ObjRef` comparison.
    pub fn intern_string(&mut self, s: &str) -> ObjRef {
        if let Some(r) = self.strings.get(s) {
            return *r;
        }
        let hash = hash_str(s);
        let r = self.alloc(Obj::String(s.to_string(), hash));
        self.strings.insert(s.to_string(), r);
        r
    }

    pub fn get(&self, r: ObjRef) -> &Obj {
        &self.objects[r.0].as_ref().expect("dangling ObjRef").obj
    }

    pub fn get_mut(&mut self, r: ObjRef) -> &mut Obj {
        self.objects[r.0].as_mut().expect("dangling ObjRef").obj_mut()
    }

    pub fn as_str(&self, r: ObjRef) -> &str {
        match self.get(r) {
            Obj::String(s, _) => s,
            other => panic!("expected string object, found {}", other.type_name()),
        }
    }

    pub fn string_hash(&self, r: ObjRef) -> u32 {
        match self.get(r) {
            Obj::String(_, h) => *h,
            other => panic!("expected string object, found {}", other.type_name()),
        }
    }

    pub fn format_obj(&self, r: ObjRef) -> String {
        match self.get(r) {
            Obj::String(s, _) => s.clone(),
            Obj::Function(f) => match f.name {
                Some(n) => format!("<fn {}>", self.as_str(n)),
                None => "<script>".to_string(),
            },
            Obj::Closure(c) => match c.function.name {
                Some(n) => format!("<fn {}>", self.as_str(n)),
                None => "<script>".to_string(),
            },
            Obj::Upvalue(_) => "<upvalue>".to_string(),
            Obj::Class(c) => self.as_str(c.name).to_string(),
            Obj::Instance(i) => format!("{} instance", self.as_str(self.class_name(i.class))),
            Obj::BoundMethod(b) => {
                let Obj::Closure(c) = self.get(b.method) else { unreachable!() };
                match c.function.name {
                    Some(n) => format!("<fn {}>", self.as_str(n)),
                    None => "<script>".to_string(),
                }
            }
            Obj::Native(..) => "<native fn>".to_string(),
        }
    }

    fn class_name(&self, class: ObjRef) -> ObjRef {
        match self.get(class) {
            Obj::Class(c) => c.name,
            _ => unreachable!("class ref did not point at a Class"),
        }
    }

    // ── Collection ────────────────────────────────────────────────────────

    pub fn mark_value(&mut self, v: Value) {
        if let Value::Obj(r) = v {
            self.mark_object(r);
        }
    }

    pub fn mark_object(&mut self, r: ObjRef) {
        if let Some(slot) = self.objects[r.0].as_mut() {
            if !slot.marked {
                slot.marked = true;
                self.gray_stack.push(r);
            }
        }
    }

    /// Walks the gray stack, marking every object each popped object
    /// transitively references, until nothing gray remains.
    pub fn trace_references(&mut self) {
        while let Some(r) = self.gray_stack.pop() {
            self.blacken(r);
        }
    }

    fn blacken(&mut self, r: ObjRef) {
        // Collect the children first (can't hold `&self.objects[r.0]` while
        // calling back into `mark_object`, which needs `&mut self`).
        let mut child_objs: Vec<ObjRef> = Vec::new();
        let mut child_vals: Vec<Value> = Vec::new();
        match &self.objects[r.0].as_ref().unwrap().obj {
            Obj::String(..) | Obj::Native(..) => {}
            Obj::Function(f) => {
                if let Some(n) = f.name {
                    child_objs.push(n);
                }
                for c in &f.chunk.constants {
                    child_vals.push(*c);
                }
            }
            Obj::Closure(c) => {
                if let Some(n) = c.function.name {
                    child_objs.push(n);
                }
                for k in &c.function.chunk.constants {
                    child_vals.push(*k);
                }
                child_objs.extend(c.upvalues.iter().copied());
            }
            Obj::Upvalue(Upvalue::Closed(v)) => child_vals.push(*v),
            Obj::Upvalue(Upvalue::Open(_)) => {}
            Obj::Class(cls) => {
                child_objs.push(cls.name);
                for (k, v) in cls.methods.iter() {
                    child_objs.push(k);
                    child_objs.push(*v);
                }
            }
            Obj::Instance(inst) => {
                child_objs.push(inst.class);
                for (k, v) in inst.fields.iter() {
                    child_objs.push(k);
                    child_vals.push(*v);
                }
            }
            Obj::BoundMethod(b) => {
                child_vals.push(b.receiver);
                child_objs.push(b.method);
            }
        }
        for o in child_objs {
            self.mark_object(o);
        }
        for v in child_vals {
            self.mark_value(v);
        }
    }

    pub fn sweep(&mut self) {
        for idx in 0..self.objects.len() {
            let Some(slot) = self.objects[idx].as_mut() else { continue };
            if slot.marked {
                slot.marked = false;
            } else {
                let size = obj_size(&slot.obj);
                if let Obj::String(s, _) = &slot.obj {
                    self.strings.remove(s);
                }
                self.objects[idx] = None;
                self.free_slots.push(idx);
                self.bytes_allocated = self.bytes_allocated.saturating_sub(size);
            }
        }
        self.next_gc = self.bytes_allocated * GC_HEAP_GROW_FACTOR;
        if self.next_gc < INITIAL_GC_THRESHOLD {
            self.next_gc = INITIAL_GC_THRESHOLD;
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Obj {
    fn obj_mut(&mut self) -> &mut Obj {
        self
    }
}

fn obj_size(obj: &Obj) -> usize {
    use std::mem::size_of;
    match obj {
        Obj::String(s, _) => size_of::<String>() + s.len(),
        Obj::Function(_) => size_of::<crate::object::LoxFunction>(),
        Obj::Closure(c) => size_of::<Closure>() + c.upvalues.len() * size_of::<ObjRef>(),
        Obj::Upvalue(_) => size_of::<Upvalue>(),
        Obj::Class(_) => size_of::<Class>(),
        Obj::Instance(_) => size_of::<Instance>(),
        Obj::BoundMethod(_) => size_of::<crate::object::BoundMethod>(),
        Obj::Native(..) => size_of::<crate::object::NativeFn>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups_identical_strings() {
        let mut heap = Heap::new();
        let a = heap.intern_string("hello");
        let b = heap.intern_string("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_refs() {
        let mut heap = Heap::new();
        let a = heap.intern_string("hello");
        let b = heap.intern_string("world");
        assert_ne!(a, b);
    }

    #[test]
    fn sweep_reclaims_unmarked_objects() {
        let mut heap = Heap::new();
        let a = heap.intern_string("kept");
        let _b = heap.intern_string("collected");
        heap.mark_object(a);
        heap.trace_references();
        heap.sweep();
        assert_eq!(heap.as_str(a), "kept");
        assert!(heap.objects[_b.0].is_none());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new();
        let _a = heap.intern_string("a");
        heap.sweep(); // nothing marked, "a" dies, slot 0 freed
        let r = heap.alloc(Obj::String("b".into(), hash_str("b")));
        assert_eq!(r.0, 0);
    }
}
