use super::*;

/// The abort hook used until the host installs its own.
pub fn default_abort(message: &str) -> ! {
    eprintln!("escore: fatal: {message}");
    std::process::abort()
}

impl Interpreter {
    /// Creates an error object of `kind` carrying `message` verbatim.
    pub fn new_error_object(&mut self, kind: ErrorKind, message: &JsString) -> ObjectId {
        let class = self.classes.error.clone();
        let proto = self.realm.error_prototypes[kind.index()];
        let obj = self.new_object_with(class, Some(proto), ObjectKind::Error);
        self.define_property(
            obj,
            atoms::MESSAGE,
            JsValue::String(message.clone()),
            Attributes::DONT_ENUM,
        );
        obj
    }

    /// Builds an engine-raised exception, prefixing the message with the
    /// current location.
    pub fn throw_error(&mut self, kind: ErrorKind, message: &str) -> Exception {
        let text = JsString::from_str(&format!("{}: {}", self.location, message));
        let obj = self.new_error_object(kind, &text);
        tracing::trace!(kind = kind.name(), message, "raising error");
        self.throw_value(JsValue::Object(obj))
    }

    /// Wraps a thrown value with the current call path. Throwing with no try
    /// region installed is fatal.
    pub fn throw_value(&mut self, value: JsValue) -> Exception {
        let Some(region) = self.try_regions.last() else {
            self.abort("exception thrown outside any try region");
        };
        if region.kind == RegionKind::Host {
            tracing::debug!(depth = self.traceback.len(), "exception unwinding to a host region");
        }
        Exception {
            value,
            traceback: self.traceback.clone(),
        }
    }

    pub(crate) fn enter_region(&mut self, kind: RegionKind) {
        self.try_regions.push(TryRegion {
            kind,
            context_depth: self.contexts.len(),
            traceback_depth: self.traceback.len(),
        });
    }

    /// Pops the innermost try region. When it caught an exception, the
    /// context and traceback stacks are cut back to where the region began.
    pub(crate) fn leave_region(&mut self, caught: bool) {
        let Some(region) = self.try_regions.pop() else {
            self.abort("try region stack underflow");
        };
        if caught {
            self.contexts.truncate(region.context_depth);
            self.traceback.truncate(region.traceback_depth);
        }
    }

    /// Runs `f` inside a host try region so that script exceptions come back
    /// as `Err` instead of reaching the abort hook.
    pub fn protect<T>(&mut self, f: impl FnOnce(&mut Self) -> JsResult<T>) -> JsResult<T> {
        self.enter_region(RegionKind::Host);
        let saved_scope = self.contexts.last().map(|ctx| ctx.scope.clone());
        let result = f(self);
        let failed = result.is_err();
        self.leave_region(failed);
        if failed && let Some(scope) = saved_scope {
            self.context_mut().scope = scope;
        }
        result
    }

    /// Reports an unrecoverable condition to the abort hook.
    pub fn abort(&self, message: &str) -> ! {
        tracing::error!(message, "aborting interpreter");
        (self.abort_hook)(message)
    }

    /// Fires the trace hook, if one is installed.
    pub(crate) fn trace(&mut self, event: TraceEvent) {
        if let Some(hook) = self.trace_hook.clone() {
            let location = self.location.clone();
            hook(self, &location, event);
        }
    }

    /// Converts an exception that escaped to the host into an `EngineError`.
    pub(crate) fn uncaught(&mut self, exception: Exception) -> EngineError {
        let message = self.value_to_string(&exception.value);
        EngineError::Uncaught {
            message,
            value: exception.value,
            traceback: exception.traceback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_carry_kind_and_location() {
        let mut interp = Interpreter::new(Config::default());
        let v = interp
            .evaluate("loc", "var m;\ntry { null.x; } catch (e) { m = e.name + '|' + e.message; }\nm")
            .unwrap()
            .unwrap();
        let text = v.to_string();
        assert!(text.starts_with("TypeError|loc:2: "), "{text}");
    }

    #[test]
    fn uncaught_exception_reaches_host_with_traceback() {
        let mut interp = Interpreter::new(Config::default());
        let err = interp
            .evaluate("tb", "function inner() { throw new RangeError('deep'); }\nfunction outer() { inner(); }\nouter();")
            .unwrap_err();
        match err {
            EngineError::Uncaught { message, traceback, .. } => {
                assert_eq!(message, "RangeError: deep");
                assert_eq!(traceback.len(), 2);
                assert_eq!(traceback[0].call_location.line, 3);
                assert_eq!(traceback[1].call_location.line, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn regions_are_balanced_after_evaluation() {
        let mut interp = Interpreter::new(Config::default());
        let _ = interp.evaluate("t", "try { throw 1; } catch (e) {} try { undefinedThing(); } finally { }");
        assert!(interp.try_regions.is_empty());
        assert_eq!(interp.contexts.len(), 1);
        assert!(interp.traceback.is_empty());
    }

    #[test]
    fn innermost_region_kind_tracks_script_try() {
        let mut interp = Interpreter::new(Config::default());
        let region_kind = interp.create_function("regionKind", 0, |interp, _this, _args| {
            let kind = match interp.try_regions.last().map(|r| r.kind) {
                Some(RegionKind::Script) => "script",
                Some(RegionKind::Host) => "host",
                None => "none",
            };
            Ok(JsValue::string(kind))
        });
        interp.define_global("regionKind", JsValue::Object(region_kind));
        let v = interp
            .evaluate("t", "var k; try { k = regionKind(); } finally { } k + ':' + regionKind()")
            .unwrap();
        assert_eq!(v, Some(JsValue::string("script:host")));
    }

    #[test]
    fn trace_hook_sees_statements_and_calls() {
        use std::cell::RefCell;
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let mut interp = Interpreter::new(Config::default());
        interp.set_trace_hook(Some(Rc::new(move |_: &mut Interpreter, loc: &Location, ev: TraceEvent| {
            sink.borrow_mut().push((loc.line, ev));
        })));
        interp.evaluate("t", "function f() {\n return 1;\n}\nf();").unwrap();
        let seen = events.borrow().clone();
        assert!(seen.contains(&(4, TraceEvent::Statement)));
        assert!(seen.contains(&(4, TraceEvent::Call)));
        assert!(seen.contains(&(2, TraceEvent::Statement)));
        assert!(seen.contains(&(4, TraceEvent::Return)));
    }
}
