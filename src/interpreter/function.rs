use super::*;

/// Script function instances. Instance-visible properties live in the
/// definition's shared "common" object so that joined instances agree.
pub(crate) struct FunctionClass;

impl ObjectClass for FunctionClass {
    fn class_name(&self) -> &'static str {
        "Function"
    }

    fn get(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<JsValue> {
        let Some(data) = interp.function_data(this) else {
            return Ok(JsValue::Undefined);
        };
        if name == atoms::ARGUMENTS && interp.config.compat.contains(CompatFlags::EXT1) {
            return Ok(interp.active_arguments(this));
        }
        let common = interp.function_common(&data.literal);
        if name == atoms::PROTOTYPE {
            interp.ensure_function_prototype(this, common);
        }
        if let Some(entry) = interp.heap.get(common).and_then(|c| c.store.get(name)) {
            return Ok(entry.value.clone());
        }
        match interp.prototype_of(this) {
            Some(proto) => interp.get(proto, name),
            None => Ok(JsValue::Undefined),
        }
    }

    fn put(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        name: Atom,
        value: JsValue,
        attrs: Attributes,
    ) -> JsResult<()> {
        if !self.can_put(interp, this, name)? {
            return Ok(());
        }
        let Some(data) = interp.function_data(this) else {
            return Ok(());
        };
        let common = interp.function_common(&data.literal);
        if let Some(c) = interp.heap.get_mut(common) {
            match c.store.get_mut(name) {
                Some(entry) => entry.value = value,
                None => c.store.insert(name, value, attrs),
            }
        }
        Ok(())
    }

    fn can_put(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        let Some(data) = interp.function_data(this) else {
            return Ok(false);
        };
        let common = interp.function_common(&data.literal);
        if let Some(entry) = interp.heap.get(common).and_then(|c| c.store.get(name)) {
            return Ok(!entry.attrs.contains(Attributes::READ_ONLY));
        }
        match interp.prototype_of(this) {
            Some(proto) => interp.can_put(proto, name),
            None => Ok(true),
        }
    }

    fn has_property(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        let Some(data) = interp.function_data(this) else {
            return Ok(false);
        };
        let common = interp.function_common(&data.literal);
        if name == atoms::PROTOTYPE {
            interp.ensure_function_prototype(this, common);
        }
        if interp.heap.get(common).is_some_and(|c| c.store.contains(name)) {
            return Ok(true);
        }
        match interp.prototype_of(this) {
            Some(proto) => interp.has_property(proto, name),
            None => Ok(false),
        }
    }

    fn delete(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        let Some(data) = interp.function_data(this) else {
            return Ok(true);
        };
        let common = interp.function_common(&data.literal);
        if name == atoms::PROTOTYPE {
            interp.ensure_function_prototype(this, common);
        }
        Ok(interp.native_delete(common, name))
    }

    fn own_keys(&self, interp: &mut Interpreter, this: ObjectId) -> Vec<(Atom, Attributes)> {
        let Some(data) = interp.function_data(this) else {
            return Vec::new();
        };
        let common = interp.function_common(&data.literal);
        interp.ensure_function_prototype(this, common);
        interp.native_own_keys(common)
    }

    fn is_callable(&self, _interp: &Interpreter, _this: ObjectId) -> bool {
        true
    }

    fn call(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        this_value: JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        interp.call_function(this, this_value, args)
    }

    fn is_constructor(&self, _interp: &Interpreter, _this: ObjectId) -> bool {
        true
    }

    fn construct(&self, interp: &mut Interpreter, this: ObjectId, args: &[JsValue]) -> JsResult<JsValue> {
        interp.construct_function(this, args)
    }

    fn implements_has_instance(&self) -> bool {
        true
    }

    fn has_instance(&self, interp: &mut Interpreter, this: ObjectId, value: &JsValue) -> JsResult<bool> {
        interp.function_has_instance(this, value)
    }
}

/// Built-in and host functions.
pub(crate) struct NativeFunctionClass;

impl ObjectClass for NativeFunctionClass {
    fn class_name(&self) -> &'static str {
        "Function"
    }

    fn is_callable(&self, _interp: &Interpreter, _this: ObjectId) -> bool {
        true
    }

    fn call(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        this_value: JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        match interp.native_function(this) {
            Some(native) => (native.call)(interp, this_value, args),
            None => Ok(JsValue::Undefined),
        }
    }

    fn is_constructor(&self, interp: &Interpreter, this: ObjectId) -> bool {
        interp
            .native_function(this)
            .is_some_and(|native| native.construct.is_some())
    }

    fn construct(&self, interp: &mut Interpreter, this: ObjectId, args: &[JsValue]) -> JsResult<JsValue> {
        match interp.native_function(this).and_then(|native| native.construct) {
            Some(construct) => construct(interp, JsValue::Undefined, args),
            None => Err(interp.throw_error(ErrorKind::TypeError, "object is not a constructor")),
        }
    }

    fn implements_has_instance(&self) -> bool {
        true
    }

    fn has_instance(&self, interp: &mut Interpreter, this: ObjectId, value: &JsValue) -> JsResult<bool> {
        interp.function_has_instance(this, value)
    }
}

/// The `arguments` object. Indices below the smaller of the argument count
/// and the formal count alias the activation's parameter bindings.
pub(crate) struct ArgumentsClass;

impl ArgumentsClass {
    fn alias(interp: &Interpreter, this: ObjectId, name: Atom) -> Option<(ObjectId, Atom)> {
        let ObjectKind::Arguments(data) = &interp.heap.get(this)?.kind else {
            return None;
        };
        let index = interp.interner.resolve(name).as_array_index()? as usize;
        let mapped = data.argc.min(data.literal.params.len());
        (index < mapped).then(|| (data.activation, data.literal.params[index]))
    }
}

impl ObjectClass for ArgumentsClass {
    fn class_name(&self) -> &'static str {
        "Object"
    }

    fn get(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<JsValue> {
        match Self::alias(interp, this, name) {
            Some((activation, param)) => interp.get(activation, param),
            None => interp.native_get(this, name),
        }
    }

    fn put(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        name: Atom,
        value: JsValue,
        attrs: Attributes,
    ) -> JsResult<()> {
        match Self::alias(interp, this, name) {
            Some((activation, param)) => interp.put(activation, param, value),
            None => interp.native_put(this, name, value, attrs),
        }
    }

    fn can_put(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        match Self::alias(interp, this, name) {
            Some((activation, param)) => interp.can_put(activation, param),
            None => interp.native_can_put(this, name),
        }
    }

    fn has_property(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        match Self::alias(interp, this, name) {
            Some((activation, param)) => interp.has_property(activation, param),
            None => interp.native_has_property(this, name),
        }
    }

    fn delete(&self, interp: &mut Interpreter, this: ObjectId, name: Atom) -> JsResult<bool> {
        match Self::alias(interp, this, name) {
            Some((activation, param)) => interp.delete(activation, param),
            None => Ok(interp.native_delete(this, name)),
        }
    }

    fn own_keys(&self, interp: &mut Interpreter, this: ObjectId) -> Vec<(Atom, Attributes)> {
        let mapped = match interp.heap.get(this).map(|o| &o.kind) {
            Some(ObjectKind::Arguments(data)) => data.argc.min(data.literal.params.len()),
            _ => 0,
        };
        let mut keys: Vec<(Atom, Attributes)> = (0..mapped)
            .map(|i| (interp.index_atom(i as u32), Attributes::empty()))
            .collect();
        keys.extend(interp.native_own_keys(this));
        keys
    }

    fn default_value(
        &self,
        interp: &mut Interpreter,
        this: ObjectId,
        hint: Option<Hint>,
    ) -> JsResult<JsValue> {
        if interp.config.compat.contains(CompatFlags::EXT1) {
            return interp.arguments_listing(this).map(JsValue::String);
        }
        interp.native_default_value(this, hint)
    }
}

impl Interpreter {
    pub(crate) fn function_data(&self, id: ObjectId) -> Option<FunctionData> {
        match &self.heap.get(id)?.kind {
            ObjectKind::Function(data) => Some(data.clone()),
            _ => None,
        }
    }

    pub(crate) fn native_function(&self, id: ObjectId) -> Option<NativeFunction> {
        match &self.heap.get(id)?.kind {
            ObjectKind::Native(native) => Some(native.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_activation(&self, id: ObjectId) -> bool {
        matches!(self.heap.get(id).map(|o| &o.kind), Some(ObjectKind::Activation))
    }

    /// The property store shared by every instance of `literal`. Recreated
    /// when the previous one was collected along with its instances.
    pub(crate) fn function_common(&mut self, literal: &Rc<FunctionLiteral>) -> ObjectId {
        if let Some(common) = literal.common.get()
            && self.heap.contains(common)
        {
            return common;
        }
        let class = self.classes.object.clone();
        let common = self.new_object_with(class, None, ObjectKind::Ordinary);
        self.define_property(
            common,
            atoms::LENGTH,
            JsValue::Number(literal.params.len() as f64),
            Attributes::READ_ONLY | Attributes::DONT_DELETE | Attributes::DONT_ENUM,
        );
        literal.common.set(Some(common));
        common
    }

    /// Creates the `prototype` object on first use.
    pub(crate) fn ensure_function_prototype(&mut self, func: ObjectId, common: ObjectId) {
        if self.heap.get(common).is_none_or(|c| c.store.contains(atoms::PROTOTYPE)) {
            return;
        }
        let proto = self.new_object();
        self.define_property(proto, atoms::CONSTRUCTOR, JsValue::Object(func), Attributes::DONT_ENUM);
        self.define_property(common, atoms::PROTOTYPE, JsValue::Object(proto), Attributes::DONT_DELETE);
    }

    /// Returns a function instance for `literal` closing over `scope`, reusing
    /// the definition's cached instance when the scopes are equal.
    pub(crate) fn instantiate_function(&mut self, literal: &Rc<FunctionLiteral>, scope: Scope) -> ObjectId {
        let cached = literal.cache.get().filter(|id| self.heap.contains(*id));
        if let Some(cached) = cached
            && let Some(data) = self.function_data(cached)
            && self.scope_eq(&data.scope, &scope)
        {
            return cached;
        }
        self.function_common(literal);
        let class = self.classes.function.clone();
        let proto = self.realm.function_prototype;
        let id = self.new_object_with(
            class,
            Some(proto),
            ObjectKind::Function(FunctionData {
                literal: literal.clone(),
                scope,
            }),
        );
        if cached.is_none() {
            literal.cache.set(Some(id));
        }
        id
    }

    /// Evaluates a function expression. A named expression gets a scope
    /// object binding its own name.
    pub(crate) fn function_expression(&mut self, literal: &Rc<FunctionLiteral>) -> ObjectId {
        let scope = self.current_scope();
        match literal.name {
            Some(name) => {
                let holder = self.new_object();
                let func = self.instantiate_function(literal, scope.push(holder));
                self.define_property(
                    holder,
                    name,
                    JsValue::Object(func),
                    Attributes::DONT_DELETE | Attributes::READ_ONLY,
                );
                func
            }
            None => self.instantiate_function(literal, scope),
        }
    }

    pub(crate) fn call_function(
        &mut self,
        func: ObjectId,
        this_value: JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        let this = match this_value {
            JsValue::Object(id) => id,
            JsValue::Undefined | JsValue::Null => self.realm.global,
            primitive => self.to_object(&primitive)?,
        };
        self.invoke_function(func, this, args, CallType::Call)
    }

    pub(crate) fn construct_function(&mut self, func: ObjectId, args: &[JsValue]) -> JsResult<JsValue> {
        let proto = match self.get(func, atoms::PROTOTYPE)? {
            JsValue::Object(p) => p,
            _ => self.realm.object_prototype,
        };
        let class = self.classes.object.clone();
        let obj = self.new_object_with(class, Some(proto), ObjectKind::Ordinary);
        let result = self.invoke_function(func, obj, args, CallType::Construct)?;
        Ok(match result {
            JsValue::Object(_) => result,
            _ => JsValue::Object(obj),
        })
    }

    fn invoke_function(
        &mut self,
        func: ObjectId,
        this: ObjectId,
        args: &[JsValue],
        call_type: CallType,
    ) -> JsResult<JsValue> {
        let Some(data) = self.function_data(func) else {
            return Err(self.throw_error(ErrorKind::TypeError, "object is not a function"));
        };
        let literal = data.literal;

        self.traceback.push(TracebackEntry {
            call_location: self.location.clone(),
            callee: func,
            call_type,
        });
        self.trace(TraceEvent::Call);

        let activation = self.new_object_with(self.classes.activation.clone(), None, ObjectKind::Activation);
        let arguments = self.create_arguments(func, activation, &literal, args);
        self.define_property(activation, atoms::ARGUMENTS, JsValue::Object(arguments), Attributes::DONT_DELETE);
        for (i, param) in literal.params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or(JsValue::Undefined);
            self.define_property(activation, *param, value, Attributes::DONT_DELETE);
        }

        self.contexts.push(Context {
            activation: Some(activation),
            variable: activation,
            var_attrs: Attributes::DONT_DELETE,
            this,
            scope: data.scope.push(activation),
            function: Some(func),
            arguments: Some(arguments),
            result: None,
        });
        let saved_location = self.location.clone();
        self.location = Location {
            source_name: literal.body.source_name.clone(),
            line: literal.line,
        };

        let skip_body = literal.body.is_empty() && self.config.compat.contains(CompatFlags::EXT1);
        let completion = if skip_body {
            Ok(Completion::Normal)
        } else {
            self.bind_declarations(&literal.body)
                .and_then(|()| self.run_body(&literal.body))
        };

        self.location = saved_location;
        self.contexts.pop();
        self.traceback.pop();
        self.trace(TraceEvent::Return);

        match completion? {
            Completion::Return(value) => Ok(value),
            _ => Ok(JsValue::Undefined),
        }
    }

    fn create_arguments(
        &mut self,
        callee: ObjectId,
        activation: ObjectId,
        literal: &Rc<FunctionLiteral>,
        args: &[JsValue],
    ) -> ObjectId {
        let class = self.classes.arguments.clone();
        let proto = self.realm.object_prototype;
        let arguments = self.new_object_with(
            class,
            Some(proto),
            ObjectKind::Arguments(ArgumentsData {
                activation,
                literal: literal.clone(),
                argc: args.len(),
            }),
        );
        self.define_property(arguments, atoms::CALLEE, JsValue::Object(callee), Attributes::DONT_ENUM);
        self.define_property(
            arguments,
            atoms::LENGTH,
            JsValue::Number(args.len() as f64),
            Attributes::DONT_ENUM,
        );
        for (i, value) in args.iter().enumerate().skip(literal.params.len()) {
            let name = self.index_atom(i as u32);
            self.define_property(arguments, name, value.clone(), Attributes::empty());
        }
        arguments
    }

    /// `[a=1, b=2, 2=x]`: the readable form of an arguments object.
    fn arguments_listing(&mut self, arguments: ObjectId) -> JsResult<JsString> {
        let (params, argc) = match self.heap.get(arguments).map(|o| &o.kind) {
            Some(ObjectKind::Arguments(data)) => (data.literal.params.clone(), data.argc),
            _ => (Vec::new(), 0),
        };
        let mut parts = Vec::with_capacity(argc);
        for i in 0..argc {
            let index = self.index_atom(i as u32);
            let value = self.get(arguments, index)?;
            let value = self.to_string(&value)?;
            let label = match params.get(i) {
                Some(param) => self.interner.resolve(*param).to_rust_string(),
                None => i.to_string(),
            };
            parts.push(format!("{label}={value}"));
        }
        Ok(JsString::from_str(&format!("[{}]", parts.join(", "))))
    }

    /// The arguments object of the innermost running call of `func`.
    fn active_arguments(&self, func: ObjectId) -> JsValue {
        self.contexts
            .iter()
            .rev()
            .find(|ctx| ctx.function.is_some_and(|f| self.joined(f, func)))
            .and_then(|ctx| ctx.arguments)
            .map_or(JsValue::Null, JsValue::Object)
    }

    /// Declaration-binding pass: function declarations bind to fresh
    /// instances, `var` names not yet present become undefined.
    pub(crate) fn bind_declarations(&mut self, body: &FunctionBody) -> JsResult<()> {
        let (variable, attrs, scope) = {
            let ctx = self.context();
            (ctx.variable, ctx.var_attrs, ctx.scope.clone())
        };
        for literal in &body.functions {
            let Some(name) = literal.name else { continue };
            let func = self.instantiate_function(literal, scope.clone());
            let existing = self.heap.get(variable).is_some_and(|v| v.store.contains(name));
            if existing {
                self.put(variable, name, JsValue::Object(func))?;
            } else {
                self.put_with_attrs(variable, name, JsValue::Object(func), attrs)?;
            }
        }
        for name in &body.var_names {
            let existing = self.heap.get(variable).is_some_and(|v| v.store.contains(*name));
            if !existing {
                self.put_with_attrs(variable, *name, JsValue::Undefined, attrs)?;
            }
        }
        Ok(())
    }

    /// HasInstance for functions: walks the value's prototype chain looking
    /// for an object joined to `func.prototype`.
    pub(crate) fn function_has_instance(&mut self, func: ObjectId, value: &JsValue) -> JsResult<bool> {
        let JsValue::Object(mut current) = *value else {
            return Ok(false);
        };
        let JsValue::Object(proto) = self.get(func, atoms::PROTOTYPE)? else {
            return Err(self.throw_error(ErrorKind::TypeError, "function has non-object prototype"));
        };
        while let Some(next) = self.prototype_of(current) {
            if self.joined(next, proto) {
                return Ok(true);
            }
            current = next;
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(interp: &mut Interpreter, src: &str) -> JsValue {
        interp.evaluate("test", src).unwrap().unwrap_or(JsValue::Undefined)
    }

    fn both_strategies() -> [Interpreter; 2] {
        [
            Interpreter::new(Config::default()),
            Interpreter::new(Config {
                strategy: Strategy::Bytecode,
                ..Config::default()
            }),
        ]
    }

    #[test]
    fn same_literal_in_same_scope_is_memoized() {
        for mut interp in both_strategies() {
            let v = eval(&mut interp, "var a = []; for (var i = 0; i < 2; i++) a[i] = function () {}; a[0] === a[1]");
            assert_eq!(v, JsValue::Boolean(true));
        }
    }

    #[test]
    fn closures_over_different_activations_differ() {
        for mut interp in both_strategies() {
            let v = eval(
                &mut interp,
                "function mk(n) { return function () { return n; }; } var f = mk(1), g = mk(2); \
                 (f === g) + ':' + f() + ':' + g()",
            );
            assert_eq!(v.to_string(), "false:1:2");
        }
    }

    #[test]
    fn joined_instances_share_prototype_and_compare_equal() {
        let mut interp = Interpreter::new(Config::default());
        let program = "function outer() { return function inner() {}; }";
        eval(&mut interp, program);
        let f1 = eval(&mut interp, "var f1 = outer(); f1");
        let f2 = eval(&mut interp, "var f2 = outer(); f2");
        assert_ne!(f1, f2);
        let (JsValue::Object(a), JsValue::Object(b)) = (&f1, &f2) else {
            panic!("expected functions");
        };
        assert!(interp.joined(*a, *b));
        assert_eq!(eval(&mut interp, "f1 == f2"), JsValue::Boolean(true));
        assert_eq!(eval(&mut interp, "new f1() instanceof f2"), JsValue::Boolean(true));
    }

    #[test]
    fn memoization_ignores_duplicated_joined_links() {
        let mut interp = Interpreter::new(Config::default());
        let program = crate::parser::Parser::new(
            "(function () {})",
            "test",
            &mut interp.interner,
            crate::parser::ParseOptions::default(),
        )
        .unwrap()
        .parse_program()
        .unwrap();
        let crate::ast::StatementKind::Expression(crate::ast::Expression::Function(literal)) =
            &program.body.statements[0].kind
        else {
            panic!("expected function expression");
        };
        let global = interp.global_object();
        let link = interp.new_object();
        let once = Scope::empty().push(global).push(link);
        let twice = once.push(link);
        let first = interp.instantiate_function(literal, once);
        let second = interp.instantiate_function(literal, twice);
        assert_eq!(first, second);
        let other = interp.new_object();
        let third = interp.instantiate_function(literal, Scope::empty().push(global).push(other));
        assert_ne!(first, third);
        assert!(interp.joined(first, third));
    }

    #[test]
    fn arguments_alias_parameters() {
        for mut interp in both_strategies() {
            let v = eval(
                &mut interp,
                "function f(a, b) { arguments[0] = 10; b = 20; return a + ':' + arguments[1] + ':' + arguments.length; } f(1, 2, 3)",
            );
            assert_eq!(v.to_string(), "10:20:3");
        }
    }

    #[test]
    fn unmapped_arguments_are_plain() {
        let mut interp = Interpreter::new(Config::default());
        let v = eval(
            &mut interp,
            "function f(a, b) { arguments[1] = 5; return typeof b + ':' + arguments[1] + ':' + arguments[2]; } f(1, undefined, 'x')",
        );
        assert_eq!(v.to_string(), "undefined:5:x");
        let v = eval(&mut interp, "function g(a, b) { arguments[1] = 5; return b; } g(1)");
        assert_eq!(v, JsValue::Undefined);
    }

    #[test]
    fn arguments_enumerate_indices_only() {
        let mut interp = Interpreter::new(Config::default());
        let v = eval(
            &mut interp,
            "function f(a) { var s = ''; for (var k in arguments) s += k; return s; } f(1, 2, 3)",
        );
        assert_eq!(v.to_string(), "012");
    }

    #[test]
    fn ext1_arguments_listing_and_fn_arguments() {
        let mut interp = Interpreter::new(Config {
            compat: CompatFlags::EXT1,
            ..Config::default()
        });
        let v = eval(&mut interp, "function f(a, b) { return '' + arguments; } f(1, 2, 'x')");
        assert_eq!(v.to_string(), "[a=1, b=2, 2=x]");
        let v = eval(&mut interp, "function g() { return g.arguments.length; } g(1, 2)");
        assert_eq!(v, JsValue::Number(2.0));
        assert_eq!(eval(&mut interp, "g.arguments"), JsValue::Null);
    }

    #[test]
    fn prototype_is_created_lazily_with_constructor() {
        for mut interp in both_strategies() {
            let v = eval(
                &mut interp,
                "function P() { this.x = 1; } var p = new P(); \
                 (P.prototype.constructor === P) + ':' + p.x + ':' + (p instanceof P)",
            );
            assert_eq!(v.to_string(), "true:1:true");
        }
    }

    #[test]
    fn constructor_returning_object_replaces_this() {
        let mut interp = Interpreter::new(Config::default());
        let v = eval(&mut interp, "function C() { this.a = 1; return { b: 2 }; } var c = new C(); c.a + ':' + c.b");
        assert_eq!(v.to_string(), "undefined:2");
    }

    #[test]
    fn function_length_is_read_only() {
        let mut interp = Interpreter::new(Config::default());
        let v = eval(&mut interp, "function f(a, b, c) {} f.length = 9; f.length");
        assert_eq!(v, JsValue::Number(3.0));
    }

    #[test]
    fn named_function_expression_sees_its_name() {
        for mut interp in both_strategies() {
            let v = eval(
                &mut interp,
                "var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); }; \
                 fact(5) + ':' + typeof f",
            );
            assert_eq!(v.to_string(), "120:undefined");
        }
    }

    #[test]
    fn instanceof_with_non_object_prototype_throws() {
        let mut interp = Interpreter::new(Config::default());
        let v = eval(
            &mut interp,
            "function F() {} F.prototype = 3; var r; try { ({}) instanceof F; } catch (e) { r = e.name; } r",
        );
        assert_eq!(v.to_string(), "TypeError");
        assert_eq!(eval(&mut interp, "1 instanceof F"), JsValue::Boolean(false));
    }
}
