use super::*;

struct Slot {
    generation: u32,
    object: Option<JsObject>,
}

/// Arena of object slots addressed by generation-checked handles.
#[derive(Default)]
pub(crate) struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
    pub(crate) alloc_count: usize,
}

impl Heap {
    pub(crate) fn get(&self, id: ObjectId) -> Option<&JsObject> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut JsObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_mut()
    }

    pub(crate) fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    fn insert(&mut self, obj: JsObject) -> ObjectId {
        self.alloc_count += 1;
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(obj);
            ObjectId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                object: Some(obj),
            });
            ObjectId {
                index,
                generation: 0,
            }
        }
    }

    /// Frees every unmarked slot; a freed slot's generation is bumped so that
    /// outstanding handles to it go stale.
    fn sweep(&mut self, marks: &[bool]) -> usize {
        let mut freed = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_some() && !marks[i] {
                slot.object = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(i as u32);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }
}

impl Interpreter {
    pub(crate) fn allocate(&mut self, obj: JsObject) -> ObjectId {
        if let Some(limit) = self.config.object_limit
            && self.heap.live() >= limit
        {
            self.abort("object limit exhausted");
        }
        self.heap.insert(obj)
    }

    /// Collects at a safe point once enough objects were allocated since the
    /// last collection. `extra` holds values only the caller knows about.
    pub(crate) fn maybe_collect(&mut self, extra: &[JsValue]) {
        if self.call_depth > 0 || self.heap.alloc_count < self.config.gc_threshold {
            return;
        }
        self.collect_with_roots(extra);
    }

    pub fn live_objects(&self) -> usize {
        self.heap.live()
    }

    /// Runs a full mark-sweep collection.
    pub fn collect_garbage(&mut self) -> usize {
        self.collect_with_roots(&[])
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn collect_with_roots(&mut self, extra: &[JsValue]) -> usize {
        self.heap.alloc_count = 0;
        let mut marks = vec![false; self.heap.slots.len()];
        let mut worklist: Vec<ObjectId> = Vec::new();

        worklist.extend(self.realm.roots());
        worklist.extend(self.pins.keys().copied());
        for ctx in &self.contexts {
            worklist.push(ctx.variable);
            worklist.push(ctx.this);
            worklist.extend(ctx.activation);
            worklist.extend(ctx.function);
            worklist.extend(ctx.arguments);
            worklist.extend(ctx.scope.objects());
            if let Some(JsValue::Object(id)) = &ctx.result {
                worklist.push(*id);
            }
        }
        for value in extra {
            if let JsValue::Object(id) = value {
                worklist.push(*id);
            }
        }

        while let Some(id) = worklist.pop() {
            let idx = id.index as usize;
            if idx >= marks.len() || marks[idx] {
                continue;
            }
            let Some(obj) = self.heap.get(id) else {
                continue;
            };
            marks[idx] = true;

            worklist.extend(obj.prototype);
            for value in obj.store.values() {
                if let JsValue::Object(child) = value {
                    worklist.push(*child);
                }
            }
            match &obj.kind {
                ObjectKind::Function(data) => {
                    worklist.extend(data.scope.objects());
                    worklist.extend(data.literal.common.get());
                }
                ObjectKind::Arguments(data) => {
                    worklist.push(data.activation);
                }
                ObjectKind::Host(data) => {
                    obj.class.trace(&**data, &mut worklist);
                }
                _ => {}
            }
        }

        let freed = self.heap.sweep(&marks);
        tracing::debug!(freed, live = self.heap.live(), "garbage collection finished");
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_objects_are_reclaimed() {
        let mut interp = Interpreter::new(Config::default());
        interp.collect_garbage();
        for _ in 0..10 {
            interp.new_object();
        }
        assert_eq!(interp.collect_garbage(), 10);
    }

    #[test]
    fn pinned_and_global_objects_survive() {
        let mut interp = Interpreter::new(Config::default());
        let pinned = interp.new_object();
        interp.pin(pinned);
        let held = interp.new_object();
        let name = interp.intern("held");
        let global = interp.global_object();
        interp.put(global, name, JsValue::Object(held)).unwrap();
        interp.collect_garbage();
        assert!(interp.object(pinned).is_some());
        assert!(interp.object(held).is_some());
        interp.unpin(pinned);
        interp.collect_garbage();
        assert!(interp.object(pinned).is_none());
    }

    #[test]
    fn cycles_are_collected() {
        let mut interp = Interpreter::new(Config::default());
        interp.collect_garbage();
        let a = interp.new_object();
        let b = interp.new_object();
        let link = interp.intern("link");
        interp.put(a, link, JsValue::Object(b)).unwrap();
        interp.put(b, link, JsValue::Object(a)).unwrap();
        assert_eq!(interp.collect_garbage(), 2);
    }

    struct Holder {
        held: ObjectId,
    }

    struct HolderClass;

    impl ObjectClass for HolderClass {
        fn class_name(&self) -> &'static str {
            "Holder"
        }

        fn trace(&self, data: &dyn std::any::Any, out: &mut Vec<ObjectId>) {
            if let Some(holder) = data.downcast_ref::<Holder>() {
                out.push(holder.held);
            }
        }
    }

    #[test]
    fn host_payload_references_are_traced() {
        let mut interp = Interpreter::new(Config::default());
        let held = interp.new_object();
        let host = interp.create_host_object(Rc::new(HolderClass), Box::new(Holder { held }));
        interp.define_global("holder", JsValue::Object(host));
        let untraced = interp.new_object();
        let opaque = interp.create_host_object(Rc::new(NativeClass { name: "Opaque" }), Box::new(untraced));
        interp.define_global("opaque", JsValue::Object(opaque));
        interp.collect_garbage();
        assert!(interp.object(held).is_some());
        assert!(interp.object(untraced).is_none());
    }

    #[test]
    fn closures_keep_their_scope_alive() {
        let mut interp = Interpreter::new(Config::default());
        interp
            .evaluate("gc", "function mk() { var x = 41; return function () { return x + 1; }; } var f = mk();")
            .unwrap();
        interp.collect_garbage();
        let v = interp.evaluate("gc", "f()").unwrap();
        assert_eq!(v, Some(JsValue::Number(42.0)));
    }
}
