use super::*;
use std::any::Any;

/// Native callable: `(interpreter, this, arguments)`.
pub type NativeFn = fn(&mut Interpreter, JsValue, &[JsValue]) -> JsResult<JsValue>;

/// The per-class operation table every object answers.
///
/// The provided methods implement native-object behaviour over the object's
/// [`PropertyStore`] and prototype chain. Classes override what differs;
/// Call, Construct and HasInstance are absent unless the matching `is_*` /
/// `implements_*` predicate returns true.
pub trait ObjectClass {
    /// The `[[Class]]` name reported by `Object.prototype.toString`.
    fn class_name(&self) -> &'static str;

    fn get(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<JsValue> {
        interp.native_get(this, name)
    }

    fn put(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        name: Atom,
        value: JsValue,
        attrs: Attributes,
    ) -> JsResult<()> {
        interp.native_put(this, name, value, attrs)
    }

    fn can_put(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        interp.native_can_put(this, name)
    }

    fn has_property(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        interp.native_has_property(this, name)
    }

    fn delete(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        Ok(interp.native_delete(this, name))
    }

    fn default_value(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        hint: Option<Hint>,
    ) -> JsResult<JsValue> {
        interp.native_default_value(this, hint)
    }

    /// Own property names with their attributes, in enumeration order.
    fn own_keys(&self, interp: &mut Interpreter, this: ObjectId) -> Vec<(Atom, Attributes)> {
        interp.native_own_keys(this)
    }

    /// Own and inherited enumerable names, each once.
    fn enumerate(&self, interp: &mut Interpreter, this: ObjectId) -> Vec<Atom> {
        interp.native_enumerate(this)
    }

    fn is_callable(&self, _interp: &Interpreter, _this: ObjectId) -> bool {
        false
    }

    fn call(
        &self,
        interp: &mut Interpreter,
        _this: ObjectId,
        _this_value: JsValue,
        _args: &[JsValue],
    ) -> JsResult<JsValue> {
        Err(interp.throw_error(ErrorKind::TypeError, "object is not a function"))
    }

    fn is_constructor(&self, _interp: &Interpreter, _this: ObjectId) -> bool {
        false
    }

    fn construct(&self, interp: &mut Interpreter, _this: ObjectId, _args: &[JsValue]) -> JsResult<JsValue> {
        Err(interp.throw_error(ErrorKind::TypeError, "object is not a constructor"))
    }

    fn implements_has_instance(&self) -> bool {
        false
    }

    fn has_instance(&self, interp: &mut Interpreter, _this: ObjectId, _value: &JsValue) -> JsResult<bool> {
        Err(interp.throw_error(ErrorKind::TypeError, "object is not usable with instanceof"))
    }

    /// Reports the objects a host payload refers to. The collector treats
    /// them as reachable from the object; anything not reported must be
    /// pinned by the host.
    fn trace(&self, _data: &dyn Any, _out: &mut Vec<ObjectId>) {}
}

/// Plain native object of a fixed `[[Class]]`.
pub struct NativeClass {
    pub name: &'static str,
}

impl ObjectClass for NativeClass {
    fn class_name(&self) -> &'static str {
        self.name
    }
}

/// Stands in for objects whose slot has been reclaimed.
pub(crate) struct DeadClass;

impl ObjectClass for DeadClass {
    fn class_name(&self) -> &'static str {
        "Dead"
    }

    fn get(&self, _: &mut Interpreter, _: ObjectId, _: Atom) -> JsResult<JsValue> {
        Ok(JsValue::Undefined)
    }

    fn put(&self, _: &mut Interpreter, _: ObjectId, _: Atom, _: JsValue, _: Attributes) -> JsResult<()> {
        Ok(())
    }

    fn can_put(&self, _: &mut Interpreter, _: ObjectId, _: Atom) -> JsResult<bool> {
        Ok(false)
    }

    fn has_property(&self, _: &mut Interpreter, _: ObjectId, _: Atom) -> JsResult<bool> {
        Ok(false)
    }

    fn delete(&self, _: &mut Interpreter, _: ObjectId, _: Atom) -> JsResult<bool> {
        Ok(true)
    }

    fn default_value(&self, _: &mut Interpreter, _: ObjectId, _: Option<Hint>) -> JsResult<JsValue> {
        Ok(JsValue::Undefined)
    }

    fn own_keys(&self, _: &mut Interpreter, _: ObjectId) -> Vec<(Atom, Attributes)> {
        Vec::new()
    }

    fn enumerate(&self, _: &mut Interpreter, _: ObjectId) -> Vec<Atom> {
        Vec::new()
    }
}

const BUCKETS: usize = 16;

#[derive(Clone, Debug)]
pub struct PropertyEntry {
    pub name: Atom,
    pub value: JsValue,
    pub attrs: Attributes,
    seq: u32,
}

/// Fixed-size hash table of chained entries. Names are atoms, so lookup
/// compares identity only.
#[derive(Default, Debug)]
pub struct PropertyStore {
    buckets: Vec<Vec<PropertyEntry>>,
    next_seq: u32,
    len: usize,
}

impl PropertyStore {
    fn bucket(name: Atom) -> usize {
        name.index() % BUCKETS
    }

    pub fn get(&self, name: Atom) -> Option<&PropertyEntry> {
        self.buckets
            .get(Self::bucket(name))?
            .iter()
            .find(|e| e.name == name)
    }

    pub fn get_mut(&mut self, name: Atom) -> Option<&mut PropertyEntry> {
        self.buckets
            .get_mut(Self::bucket(name))?
            .iter_mut()
            .find(|e| e.name == name)
    }

    pub fn contains(&self, name: Atom) -> bool {
        self.get(name).is_some()
    }

    /// Creates the property, or overwrites value and attributes if it exists.
    pub fn insert(&mut self, name: Atom, value: JsValue, attrs: Attributes) {
        if let Some(entry) = self.get_mut(name) {
            entry.value = value;
            entry.attrs = attrs;
            return;
        }
        if self.buckets.is_empty() {
            self.buckets.resize_with(BUCKETS, Vec::new);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.len += 1;
        self.buckets[Self::bucket(name)].push(PropertyEntry {
            name,
            value,
            attrs,
            seq,
        });
    }

    pub fn remove(&mut self, name: Atom) -> Option<PropertyEntry> {
        let bucket = self.buckets.get_mut(Self::bucket(name))?;
        let pos = bucket.iter().position(|e| e.name == name)?;
        self.len -= 1;
        Some(bucket.remove(pos))
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<&PropertyEntry> {
        let mut all: Vec<&PropertyEntry> = self.buckets.iter().flatten().collect();
        all.sort_by_key(|e| e.seq);
        all
    }

    pub fn values(&self) -> impl Iterator<Item = &JsValue> {
        self.buckets.iter().flatten().map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A host or built-in function.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub length: u32,
    pub call: NativeFn,
    pub construct: Option<NativeFn>,
}

/// A function instance: a shared definition plus the scope it closes over.
#[derive(Clone)]
pub struct FunctionData {
    pub literal: Rc<FunctionLiteral>,
    pub scope: Scope,
}

#[derive(Clone)]
pub struct ArgumentsData {
    pub activation: ObjectId,
    pub literal: Rc<FunctionLiteral>,
    pub argc: usize,
}

/// Class-specific state carried by an object.
pub enum ObjectKind {
    Ordinary,
    Activation,
    Function(FunctionData),
    Native(NativeFunction),
    Arguments(ArgumentsData),
    Array,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Error,
    Host(Box<dyn Any>),
}

pub struct JsObject {
    pub(crate) class: Rc<dyn ObjectClass>,
    pub(crate) prototype: Option<ObjectId>,
    pub(crate) store: PropertyStore,
    pub(crate) kind: ObjectKind,
}

impl JsObject {
    pub fn new(class: Rc<dyn ObjectClass>, prototype: Option<ObjectId>, kind: ObjectKind) -> Self {
        JsObject {
            class,
            prototype,
            store: PropertyStore::default(),
            kind,
        }
    }

    pub fn prototype(&self) -> Option<ObjectId> {
        self.prototype
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PropertyStore {
        &mut self.store
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn class_name(&self) -> &'static str {
        self.class.class_name()
    }

    /// The primitive wrapped by a Boolean, Number or String object.
    pub fn primitive_value(&self) -> Option<JsValue> {
        match &self.kind {
            ObjectKind::Boolean(b) => Some(JsValue::Boolean(*b)),
            ObjectKind::Number(n) => Some(JsValue::Number(*n)),
            ObjectKind::String(s) => Some(JsValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn host_data<T: 'static>(&self) -> Option<&T> {
        match &self.kind {
            ObjectKind::Host(data) => data.downcast_ref(),
            _ => None,
        }
    }

    pub fn host_data_mut<T: 'static>(&mut self) -> Option<&mut T> {
        match &mut self.kind {
            ObjectKind::Host(data) => data.downcast_mut(),
            _ => None,
        }
    }
}

impl Interpreter {
    pub fn object(&self, id: ObjectId) -> Option<&JsObject> {
        self.heap.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut JsObject> {
        self.heap.get_mut(id)
    }

    pub(crate) fn class_of(&self, id: ObjectId) -> Rc<dyn ObjectClass> {
        match self.heap.get(id) {
            Some(obj) => obj.class.clone(),
            None => self.classes.dead.clone(),
        }
    }

    pub(crate) fn prototype_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.heap.get(id).and_then(|o| o.prototype)
    }

    pub(crate) fn new_object_with(
        &mut self,
        class: Rc<dyn ObjectClass>,
        prototype: Option<ObjectId>,
        kind: ObjectKind,
    ) -> ObjectId {
        self.allocate(JsObject::new(class, prototype, kind))
    }

    /// A fresh `Object` whose prototype is `Object.prototype`.
    pub fn new_object(&mut self) -> ObjectId {
        let proto = self.realm.object_prototype;
        self.new_object_with(self.classes.object.clone(), Some(proto), ObjectKind::Ordinary)
    }

    /// Writes a property directly into the own store, ignoring ReadOnly.
    pub fn define_property(&mut self, obj: ObjectId, name: Atom, value: JsValue, attrs: Attributes) {
        if let Some(o) = self.heap.get_mut(obj) {
            o.store.insert(name, value, attrs);
        }
    }

    // Dispatch

    pub fn get(&mut self, obj: ObjectId, name: Atom) -> JsResult<JsValue> {
        self.class_of(obj).get(self, obj, name)
    }

    pub fn put(&mut self, obj: ObjectId, name: Atom, value: JsValue) -> JsResult<()> {
        self.class_of(obj).put(self, obj, name, value, Attributes::empty())
    }

    pub fn put_with_attrs(
        &mut self,
        obj: ObjectId,
        name: Atom,
        value: JsValue,
        attrs: Attributes,
    ) -> JsResult<()> {
        self.class_of(obj).put(self, obj, name, value, attrs)
    }

    pub fn can_put(&mut self, obj: ObjectId, name: Atom) -> JsResult<bool> {
        self.class_of(obj).can_put(self, obj, name)
    }

    pub fn has_property(&mut self, obj: ObjectId, name: Atom) -> JsResult<bool> {
        self.class_of(obj).has_property(self, obj, name)
    }

    pub fn delete(&mut self, obj: ObjectId, name: Atom) -> JsResult<bool> {
        self.class_of(obj).delete(self, obj, name)
    }

    pub fn default_value(&mut self, obj: ObjectId, hint: Option<Hint>) -> JsResult<JsValue> {
        self.class_of(obj).default_value(self, obj, hint)
    }

    pub fn enumerate(&mut self, obj: ObjectId) -> Vec<Atom> {
        self.class_of(obj).enumerate(self, obj)
    }

    pub(crate) fn own_keys(&mut self, obj: ObjectId) -> Vec<(Atom, Attributes)> {
        self.class_of(obj).own_keys(self, obj)
    }

    pub fn is_callable(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(id) => self.class_of(*id).is_callable(self, *id),
            _ => false,
        }
    }

    pub fn is_constructor(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(id) => self.class_of(*id).is_constructor(self, *id),
            _ => false,
        }
    }

    /// Call dispatch, counted against the recursion limit.
    pub(crate) fn call_object(
        &mut self,
        func: ObjectId,
        this_value: JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        let class = self.class_of(func);
        if !class.is_callable(self, func) {
            return Err(self.throw_error(ErrorKind::TypeError, "object is not a function"));
        }
        let saved = self.enter_recursion()?;
        self.call_depth += 1;
        let result = stack::ensure_sufficient_stack(|| class.call(self, func, this_value, args));
        self.call_depth -= 1;
        self.recursion_remaining = saved;
        result
    }

    pub(crate) fn construct_object(&mut self, func: ObjectId, args: &[JsValue]) -> JsResult<JsValue> {
        let class = self.class_of(func);
        if !class.is_constructor(self, func) {
            return Err(self.throw_error(ErrorKind::TypeError, "object is not a constructor"));
        }
        let saved = self.enter_recursion()?;
        self.call_depth += 1;
        let result = stack::ensure_sufficient_stack(|| class.construct(self, func, args));
        self.call_depth -= 1;
        self.recursion_remaining = saved;
        result
    }

    fn enter_recursion(&mut self) -> JsResult<Option<u32>> {
        let saved = self.recursion_remaining;
        match saved {
            Some(0) => Err(self.throw_error(ErrorKind::RangeError, "recursion limit reached")),
            Some(n) => {
                self.recursion_remaining = Some(n - 1);
                Ok(saved)
            }
            None => Ok(None),
        }
    }

    pub fn has_instance(&mut self, obj: ObjectId, value: &JsValue) -> JsResult<bool> {
        let class = self.class_of(obj);
        if !class.implements_has_instance() {
            return Err(self.throw_error(ErrorKind::TypeError, "object is not usable with instanceof"));
        }
        class.has_instance(self, obj, value)
    }

    /// Same object, or function instances of one definition.
    pub fn joined(&self, a: ObjectId, b: ObjectId) -> bool {
        if a == b {
            return true;
        }
        match (self.heap.get(a).map(|o| &o.kind), self.heap.get(b).map(|o| &o.kind)) {
            (Some(ObjectKind::Function(fa)), Some(ObjectKind::Function(fb))) => {
                Rc::ptr_eq(&fa.literal, &fb.literal)
            }
            _ => false,
        }
    }

    // Native behaviour

    pub(crate) fn native_get(&mut self, obj: ObjectId, name: Atom) -> JsResult<JsValue> {
        let Some(o) = self.heap.get(obj) else {
            return Ok(JsValue::Undefined);
        };
        if let Some(entry) = o.store.get(name) {
            return Ok(entry.value.clone());
        }
        match o.prototype {
            Some(proto) => self.get(proto, name),
            None => Ok(JsValue::Undefined),
        }
    }

    pub(crate) fn native_can_put(&mut self, obj: ObjectId, name: Atom) -> JsResult<bool> {
        let Some(o) = self.heap.get(obj) else {
            return Ok(false);
        };
        if let Some(entry) = o.store.get(name) {
            return Ok(!entry.attrs.contains(Attributes::READ_ONLY));
        }
        match o.prototype {
            Some(proto) => self.can_put(proto, name),
            None => Ok(true),
        }
    }

    /// Native Put: silently drops writes CanPut forbids, overwrites the
    /// value of an existing own property, otherwise creates it with `attrs`.
    pub(crate) fn native_put(
        &mut self,
        obj: ObjectId,
        name: Atom,
        value: JsValue,
        attrs: Attributes,
    ) -> JsResult<()> {
        if !self.native_can_put(obj, name)? {
            return Ok(());
        }
        let Some(o) = self.heap.get_mut(obj) else {
            return Ok(());
        };
        match o.store.get_mut(name) {
            Some(entry) => entry.value = value,
            None => o.store.insert(name, value, attrs),
        }
        Ok(())
    }

    pub(crate) fn native_has_property(&mut self, obj: ObjectId, name: Atom) -> JsResult<bool> {
        let Some(o) = self.heap.get(obj) else {
            return Ok(false);
        };
        if o.store.contains(name) {
            return Ok(true);
        }
        match o.prototype {
            Some(proto) => self.has_property(proto, name),
            None => Ok(false),
        }
    }

    pub(crate) fn native_delete(&mut self, obj: ObjectId, name: Atom) -> bool {
        let Some(o) = self.heap.get_mut(obj) else {
            return true;
        };
        match o.store.get(name) {
            Some(entry) if entry.attrs.contains(Attributes::DONT_DELETE) => false,
            Some(_) => {
                o.store.remove(name);
                true
            }
            None => true,
        }
    }

    /// Tries `valueOf` then `toString` (the reverse for a string hint) and
    /// returns the first primitive result.
    pub(crate) fn native_default_value(&mut self, obj: ObjectId, hint: Option<Hint>) -> JsResult<JsValue> {
        let order = match hint {
            Some(Hint::String) => [atoms::TO_STRING, atoms::VALUE_OF],
            _ => [atoms::VALUE_OF, atoms::TO_STRING],
        };
        for method_name in order {
            let method = self.get(obj, method_name)?;
            if let JsValue::Object(method) = method
                && self.class_of(method).is_callable(self, method)
            {
                let result = self.call_object(method, JsValue::Object(obj), &[])?;
                if result.is_primitive() {
                    return Ok(result);
                }
            }
        }
        Err(self.throw_error(ErrorKind::TypeError, "cannot convert object to primitive value"))
    }

    pub(crate) fn native_own_keys(&mut self, obj: ObjectId) -> Vec<(Atom, Attributes)> {
        match self.heap.get(obj) {
            Some(o) => o.store.entries().iter().map(|e| (e.name, e.attrs)).collect(),
            None => Vec::new(),
        }
    }

    /// Own names first, then inherited ones. A name already seen on a nearer
    /// object (enumerable or not) shadows later occurrences.
    pub(crate) fn native_enumerate(&mut self, obj: ObjectId) -> Vec<Atom> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        let mut current = Some(obj);
        while let Some(id) = current {
            if !self.heap.contains(id) {
                break;
            }
            for (name, attrs) in self.own_keys(id) {
                if seen.insert(name)
                    && !attrs.intersects(Attributes::DONT_ENUM | Attributes::INTERNAL)
                {
                    names.push(name);
                }
            }
            current = self.prototype_of(id);
        }
        names
    }
}
