use super::*;
use crate::types::number_ops;
use std::cmp::Ordering;

/// Array instances: `length` tracks the largest index and truncates when
/// assigned a smaller value.
pub(crate) struct ArrayClass;

impl ObjectClass for ArrayClass {
    fn class_name(&self) -> &'static str {
        "Array"
    }

    // §15.4.5.1
    fn put(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        name: Atom,
        value: JsValue,
        attrs: Attributes,
    ) -> JsResult<()> {
        if name == atoms::LENGTH {
            return interp.set_array_length(this, &value);
        }
        if !interp.native_can_put(this, name)? {
            return Ok(());
        }
        interp.native_put(this, name, value, attrs)?;
        if let Some(index) = interp.interner.resolve(name).as_array_index()
            && index >= interp.array_length(this)
        {
            interp.store_array_length(this, index + 1);
        }
        Ok(())
    }
}

impl Interpreter {
    pub(crate) fn new_array(&mut self) -> ObjectId {
        let class = self.classes.array.clone();
        let proto = self.realm.array_prototype;
        let array = self.new_object_with(class, Some(proto), ObjectKind::Array);
        self.store_array_length(array, 0);
        array
    }

    pub(crate) fn array_from(&mut self, values: impl IntoIterator<Item = JsValue>) -> ObjectId {
        let array = self.new_array();
        let mut length = 0;
        for value in values {
            let index = self.index_atom(length);
            self.define_property(array, index, value, Attributes::empty());
            length += 1;
        }
        self.store_array_length(array, length);
        array
    }

    fn array_length(&self, array: ObjectId) -> u32 {
        match self.heap.get(array).and_then(|o| o.store.get(atoms::LENGTH)) {
            Some(PropertyEntry {
                value: JsValue::Number(n),
                ..
            }) => *n as u32,
            _ => 0,
        }
    }

    fn store_array_length(&mut self, array: ObjectId, length: u32) {
        self.define_property(
            array,
            atoms::LENGTH,
            JsValue::Number(f64::from(length)),
            Attributes::DONT_ENUM | Attributes::DONT_DELETE,
        );
    }

    fn set_array_length(&mut self, array: ObjectId, value: &JsValue) -> JsResult<()> {
        let number = self.to_number(value)?;
        let length = number_ops::to_uint32(number);
        if f64::from(length) != number {
            return Err(self.throw_error(ErrorKind::RangeError, "invalid array length"));
        }
        if length < self.array_length(array) {
            let doomed: Vec<Atom> = self
                .native_own_keys(array)
                .into_iter()
                .filter(|(name, _)| {
                    self.interner
                        .resolve(*name)
                        .as_array_index()
                        .is_some_and(|index| index >= length)
                })
                .map(|(name, _)| name)
                .collect();
            for name in doomed {
                self.native_delete(array, name);
            }
        }
        self.store_array_length(array, length);
        Ok(())
    }

    fn is_array(&self, obj: ObjectId) -> bool {
        matches!(self.heap.get(obj).map(|o| &o.kind), Some(ObjectKind::Array))
    }
}

/// Property name for an index that may lie past the array-index range.
fn index_name(interp: &mut Interpreter, index: u64) -> Atom {
    match u32::try_from(index) {
        Ok(i) if i < u32::MAX => interp.index_atom(i),
        _ => interp.intern(&number_ops::to_string(index as f64)),
    }
}

fn length_of(interp: &mut Interpreter, obj: ObjectId) -> JsResult<u64> {
    let length = interp.get(obj, atoms::LENGTH)?;
    Ok(u64::from(interp.to_uint32(&length)?))
}

fn set_length(interp: &mut Interpreter, obj: ObjectId, length: u64) -> JsResult<()> {
    interp.put(obj, atoms::LENGTH, JsValue::Number(length as f64))
}

fn get_index(interp: &mut Interpreter, obj: ObjectId, index: u64) -> JsResult<JsValue> {
    let name = index_name(interp, index);
    interp.get(obj, name)
}

fn put_index(interp: &mut Interpreter, obj: ObjectId, index: u64, value: JsValue) -> JsResult<()> {
    let name = index_name(interp, index);
    interp.put(obj, name, value)
}

fn has_index(interp: &mut Interpreter, obj: ObjectId, index: u64) -> JsResult<bool> {
    let name = index_name(interp, index);
    interp.has_property(obj, name)
}

fn delete_index(interp: &mut Interpreter, obj: ObjectId, index: u64) -> JsResult<bool> {
    let name = index_name(interp, index);
    interp.delete(obj, name)
}

/// Moves element `from` to `to`, deleting `to` when `from` is a hole.
fn move_index(interp: &mut Interpreter, obj: ObjectId, from: u64, to: u64) -> JsResult<()> {
    if has_index(interp, obj, from)? {
        let value = get_index(interp, obj, from)?;
        put_index(interp, obj, to, value)
    } else {
        delete_index(interp, obj, to).map(drop)
    }
}

/// Resolves a relative position against `length`: negative counts from the end.
fn relative_position(interp: &mut Interpreter, value: &JsValue, length: u64) -> JsResult<u64> {
    let relative = interp.to_integer(value)?;
    let length = length as f64;
    Ok(if relative < 0.0 {
        (length + relative).max(0.0) as u64
    } else {
        relative.min(length) as u64
    })
}

fn join(interp: &mut Interpreter, this: &JsValue, separator: &JsValue) -> JsResult<JsValue> {
    let obj = interp.this_object(this)?;
    let length = length_of(interp, obj)?;
    let separator = match separator {
        JsValue::Undefined => JsString::from_str(","),
        other => interp.to_string(other)?,
    };
    let mut units = Vec::new();
    for i in 0..length {
        if i > 0 {
            units.extend_from_slice(separator.as_units());
        }
        let element = get_index(interp, obj, i)?;
        if !matches!(element, JsValue::Undefined | JsValue::Null) {
            units.extend_from_slice(interp.to_string(&element)?.as_units());
        }
    }
    Ok(JsValue::String(JsString::from_units(units)))
}

fn array_construct(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    if let [JsValue::Number(n)] = args {
        let length = number_ops::to_uint32(*n);
        if f64::from(length) != *n {
            return Err(interp.throw_error(ErrorKind::RangeError, "invalid array length"));
        }
        let array = interp.new_array();
        interp.store_array_length(array, length);
        return Ok(JsValue::Object(array));
    }
    Ok(JsValue::Object(interp.array_from(args.iter().cloned())))
}

// §15.4.4.11: undefined sorts after everything, holes after that
fn sort_compare(interp: &mut Interpreter, compare: &JsValue, x: &JsValue, y: &JsValue) -> JsResult<Ordering> {
    if let JsValue::Object(f) = compare {
        let result = interp.call_object(*f, JsValue::Undefined, &[x.clone(), y.clone()])?;
        let n = interp.to_number(&result)?;
        return Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal));
    }
    let x = interp.to_string(x)?;
    let y = interp.to_string(y)?;
    Ok(x.as_units().cmp(y.as_units()))
}

fn merge_sort(interp: &mut Interpreter, mut items: Vec<JsValue>, compare: &JsValue) -> JsResult<Vec<JsValue>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let left: Vec<JsValue> = items.drain(..items.len() / 2).collect();
    let left = merge_sort(interp, left, compare)?;
    let right = merge_sort(interp, items, compare)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if sort_compare(interp, compare, b, a)? == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

impl Interpreter {
    pub(super) fn setup_array(&mut self) {
        let class = self.classes.array.clone();
        let object_prototype = self.realm.object_prototype;
        let proto = self.new_object_with(class, Some(object_prototype), ObjectKind::Array);
        self.store_array_length(proto, 0);
        self.realm.array_prototype = proto;
        self.create_constructor("Array", 1, array_construct, array_construct, proto);

        self.define_method(proto, "toString", 0, |interp, this, _args| {
            join(interp, &this, &JsValue::Undefined)
        });
        self.define_method(proto, "join", 1, |interp, this, args| join(interp, &this, &arg(args, 0)));

        self.define_method(proto, "push", 1, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let mut length = length_of(interp, obj)?;
            for value in args {
                put_index(interp, obj, length, value.clone())?;
                length += 1;
            }
            set_length(interp, obj, length)?;
            Ok(JsValue::Number(length as f64))
        });
        self.define_method(proto, "pop", 0, |interp, this, _args| {
            let obj = interp.this_object(&this)?;
            let length = length_of(interp, obj)?;
            if length == 0 {
                set_length(interp, obj, 0)?;
                return Ok(JsValue::Undefined);
            }
            let value = get_index(interp, obj, length - 1)?;
            delete_index(interp, obj, length - 1)?;
            set_length(interp, obj, length - 1)?;
            Ok(value)
        });
        self.define_method(proto, "shift", 0, |interp, this, _args| {
            let obj = interp.this_object(&this)?;
            let length = length_of(interp, obj)?;
            if length == 0 {
                set_length(interp, obj, 0)?;
                return Ok(JsValue::Undefined);
            }
            let first = get_index(interp, obj, 0)?;
            for k in 1..length {
                move_index(interp, obj, k, k - 1)?;
            }
            delete_index(interp, obj, length - 1)?;
            set_length(interp, obj, length - 1)?;
            Ok(first)
        });
        self.define_method(proto, "unshift", 1, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let length = length_of(interp, obj)?;
            let count = args.len() as u64;
            for k in (0..length).rev() {
                move_index(interp, obj, k, k + count)?;
            }
            for (j, value) in args.iter().enumerate() {
                put_index(interp, obj, j as u64, value.clone())?;
            }
            set_length(interp, obj, length + count)?;
            Ok(JsValue::Number((length + count) as f64))
        });

        self.define_method(proto, "slice", 2, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let length = length_of(interp, obj)?;
            let start = relative_position(interp, &arg(args, 0), length)?;
            let end = match arg(args, 1) {
                JsValue::Undefined => length,
                end => relative_position(interp, &end, length)?,
            };
            let result = interp.new_array();
            let mut n = 0;
            for k in start..end.max(start) {
                if has_index(interp, obj, k)? {
                    let value = get_index(interp, obj, k)?;
                    put_index(interp, result, n, value)?;
                }
                n += 1;
            }
            set_length(interp, result, n)?;
            Ok(JsValue::Object(result))
        });

        // §15.4.4.12
        self.define_method(proto, "splice", 2, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let length = length_of(interp, obj)?;
            let start = relative_position(interp, &arg(args, 0), length)?;
            let delete_count = interp.to_integer(&arg(args, 1))?;
            let delete_count = delete_count.max(0.0).min((length - start) as f64) as u64;
            let removed = interp.new_array();
            for k in 0..delete_count {
                if has_index(interp, obj, start + k)? {
                    let value = get_index(interp, obj, start + k)?;
                    put_index(interp, removed, k, value)?;
                }
            }
            set_length(interp, removed, delete_count)?;

            let items = args.get(2..).unwrap_or(&[]);
            let item_count = items.len() as u64;
            if item_count < delete_count {
                for k in start..length - delete_count {
                    move_index(interp, obj, k + delete_count, k + item_count)?;
                }
                for k in (length - delete_count + item_count..length).rev() {
                    delete_index(interp, obj, k)?;
                }
            } else if item_count > delete_count {
                for k in (start..length - delete_count).rev() {
                    move_index(interp, obj, k + delete_count, k + item_count)?;
                }
            }
            for (j, value) in items.iter().enumerate() {
                put_index(interp, obj, start + j as u64, value.clone())?;
            }
            set_length(interp, obj, length - delete_count + item_count)?;
            Ok(JsValue::Object(removed))
        });

        self.define_method(proto, "concat", 1, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let result = interp.new_array();
            let mut n = 0;
            let items = std::iter::once(JsValue::Object(obj)).chain(args.iter().cloned());
            for item in items {
                match item {
                    JsValue::Object(source) if interp.is_array(source) => {
                        let length = length_of(interp, source)?;
                        for k in 0..length {
                            if has_index(interp, source, k)? {
                                let value = get_index(interp, source, k)?;
                                put_index(interp, result, n + k, value)?;
                            }
                        }
                        n += length;
                    }
                    other => {
                        put_index(interp, result, n, other)?;
                        n += 1;
                    }
                }
            }
            set_length(interp, result, n)?;
            Ok(JsValue::Object(result))
        });

        self.define_method(proto, "reverse", 0, |interp, this, _args| {
            let obj = interp.this_object(&this)?;
            let length = length_of(interp, obj)?;
            for lower in 0..length / 2 {
                let upper = length - lower - 1;
                let lower_value = has_index(interp, obj, lower)?
                    .then(|| get_index(interp, obj, lower))
                    .transpose()?;
                let upper_value = has_index(interp, obj, upper)?
                    .then(|| get_index(interp, obj, upper))
                    .transpose()?;
                match upper_value {
                    Some(value) => put_index(interp, obj, lower, value)?,
                    None => delete_index(interp, obj, lower).map(drop)?,
                }
                match lower_value {
                    Some(value) => put_index(interp, obj, upper, value)?,
                    None => delete_index(interp, obj, upper).map(drop)?,
                }
            }
            Ok(JsValue::Object(obj))
        });

        self.define_method(proto, "sort", 1, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let compare = arg(args, 0);
            if !compare.is_undefined() && !interp.is_callable(&compare) {
                return Err(interp.throw_error(ErrorKind::TypeError, "sort comparator is not a function"));
            }
            let length = length_of(interp, obj)?;
            let mut present = Vec::new();
            let mut undefined_count = 0;
            for k in 0..length {
                if has_index(interp, obj, k)? {
                    match get_index(interp, obj, k)? {
                        JsValue::Undefined => undefined_count += 1,
                        value => present.push(value),
                    }
                }
            }
            let sorted = merge_sort(interp, present, &compare)?;
            let filled = sorted.len() as u64 + undefined_count;
            let values = sorted
                .into_iter()
                .chain(std::iter::repeat_n(JsValue::Undefined, undefined_count as usize));
            for (k, value) in values.enumerate() {
                put_index(interp, obj, k as u64, value)?;
            }
            for k in filled..length {
                delete_index(interp, obj, k)?;
            }
            Ok(JsValue::Object(obj))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("array", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn length_follows_largest_index() {
        assert_eq!(run("var a = []; a[4] = 1; a.length"), "5");
        assert_eq!(run("var a = [1, 2]; a.x = 3; a.length"), "2");
        assert_eq!(run("var a = []; a['7'] = 0; a['07'] = 0; a.length"), "8");
    }

    #[test]
    fn shrinking_length_deletes_elements() {
        assert_eq!(run("var a = [1, 2, 3, 4]; a.length = 2; a.length + ':' + (2 in a) + ':' + a"), "2:false:1,2");
        assert_eq!(run("var a = [1]; a.length = 3; a.length + ':' + (1 in a)"), "3:false");
    }

    #[test]
    fn invalid_length_is_a_range_error() {
        assert_eq!(run("var r; try { [].length = -1; } catch (e) { r = e.name; } r"), "RangeError");
        assert_eq!(run("var r; try { [].length = 1.5; } catch (e) { r = e.name; } r"), "RangeError");
        assert_eq!(run("var r; try { new Array(-1); } catch (e) { r = e.name; } r"), "RangeError");
    }

    #[test]
    fn length_is_not_enumerable_or_deletable() {
        assert_eq!(run("var a = [1, 2]; var s = ''; for (var k in a) s += k; s + ':' + delete a.length"), "01:false");
    }

    #[test]
    fn constructor_forms() {
        assert_eq!(run("new Array(3).length + ':' + Array(1, 2).length + ':' + new Array('3').length"), "3:2:1");
    }

    #[test]
    fn stack_and_queue_methods() {
        assert_eq!(run("var a = [1, 2]; a.push(3, 4) + ':' + a.pop() + ':' + a"), "4:4:1,2,3");
        assert_eq!(run("var a = [1, 2, 3]; a.shift() + ':' + a.unshift(7, 8) + ':' + a"), "1:4:7,8,2,3");
        assert_eq!(run("var a = []; a.pop() + ':' + a.shift() + ':' + a.length"), "undefined:undefined:0");
    }

    #[test]
    fn slice_and_splice() {
        assert_eq!(run("[1, 2, 3, 4].slice(1, -1).join('-')"), "2-3");
        assert_eq!(run("[1, 2, 3].slice(-2).join('-')"), "2-3");
        assert_eq!(run("var a = [1, 2, 3, 4, 5]; var r = a.splice(1, 2, 'x'); r + '|' + a"), "2,3|1,x,4,5");
        assert_eq!(run("var a = [1, 2]; a.splice(1, 0, 'p', 'q'); a.join('')"), "1pq2");
    }

    #[test]
    fn concat_flattens_one_level() {
        assert_eq!(run("[1].concat([2, [3]], 4).length"), "4");
        assert_eq!(run("var a = [1, , 3]; var c = a.concat(); c.length + ':' + (1 in c)"), "3:false");
    }

    #[test]
    fn reverse_and_join() {
        assert_eq!(run("[1, 2, 3].reverse().join()"), "3,2,1");
        assert_eq!(run("[null, undefined, 1].join('-')"), "--1");
    }

    #[test]
    fn sort_orders_values() {
        assert_eq!(run("[10, 9, 1].sort().join()"), "1,10,9");
        assert_eq!(run("[10, 9, 1].sort(function (a, b) { return a - b; }).join()"), "1,9,10");
        assert_eq!(run("var a = [3, undefined, 1]; a.sort(); a[0] + ':' + a[1] + ':' + a[2]"), "1:3:undefined");
        assert_eq!(run("var r; try { [2, 1].sort(5); } catch (e) { r = e.name; } r"), "TypeError");
    }
}
