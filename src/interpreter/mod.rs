use crate::ast::*;
use crate::intern::{Atom, Interner, LiteralTable, atoms};
use crate::parser::{ParseError, ParseOptions, Parser};
use crate::types::{JsString, JsValue, ObjectId};
use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use std::sync::Arc;

mod types;
pub use types::*;

mod object;
pub use object::*;
mod gc;
use gc::Heap;
mod scope;
mod stack;
pub use scope::{Context, Scope};
mod function;
use function::{ArgumentsClass, FunctionClass, NativeFunctionClass};
mod helpers;
pub use helpers::{primitive_to_number, primitive_to_string, to_boolean};
pub(crate) use helpers::*;
mod error;
pub use error::default_abort;
mod exec;
use exec::TreeWalker;
mod eval;
use eval::literal_value;
mod compile;
mod vm;
use vm::StackMachine;
mod builtins;
use builtins::array::ArrayClass;

bitflags! {
    /// Behaviours that differ from strict ECMA-262 3rd edition.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct CompatFlags: u8 {
        /// Annex B: octal literals and escapes, `escape`/`unescape`.
        const ANNEX_B = 1 << 0;
        /// Engine extensions: `fn.arguments`, readable arguments objects,
        /// immediate return from empty bodies.
        const EXT1 = 1 << 1;
        /// Reading an unresolved identifier yields undefined.
        const UNDEFDEF = 1 << 2;
        /// `<!--` starts a line comment.
        const SGML_COMMENT = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    #[default]
    TreeWalk,
    Bytecode,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub compat: CompatFlags,
    pub strategy: Strategy,
    /// Nested Call/Construct dispatches allowed before RangeError.
    pub recursion_limit: Option<u32>,
    /// Fold constant subexpressions when compiling to bytecode.
    pub constant_folding: bool,
    /// Allocations between collections.
    pub gc_threshold: usize,
    /// Live objects allowed before the abort hook fires.
    pub object_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compat: CompatFlags::empty(),
            strategy: Strategy::TreeWalk,
            recursion_limit: Some(256),
            constant_folding: true,
            gc_threshold: 10_000,
            object_limit: None,
        }
    }
}

/// One way of running a program or function body.
pub(crate) trait ExecutionStrategy {
    fn execute(&self, interp: &mut Interpreter, body: &FunctionBody) -> JsResult<Completion>;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error("uncaught exception: {message}")]
    Uncaught {
        message: String,
        value: JsValue,
        traceback: Vec<TracebackEntry>,
    },
}

pub type TraceHook = Rc<dyn Fn(&mut Interpreter, &Location, TraceEvent)>;
pub type AbortHook = fn(&str) -> !;

/// The intrinsic objects every program starts with.
pub(crate) struct Realm {
    pub(crate) global: ObjectId,
    pub(crate) object_prototype: ObjectId,
    pub(crate) function_prototype: ObjectId,
    pub(crate) array_prototype: ObjectId,
    pub(crate) string_prototype: ObjectId,
    pub(crate) number_prototype: ObjectId,
    pub(crate) boolean_prototype: ObjectId,
    pub(crate) error_prototypes: [ObjectId; 7],
    pub(crate) eval_function: ObjectId,
    /// Constructors and other intrinsics kept alive even if the script
    /// deletes their global bindings.
    pub(crate) intrinsics: Vec<ObjectId>,
}

impl Realm {
    fn placeholder() -> Self {
        let none = ObjectId {
            index: u32::MAX,
            generation: u32::MAX,
        };
        Realm {
            global: none,
            object_prototype: none,
            function_prototype: none,
            array_prototype: none,
            string_prototype: none,
            number_prototype: none,
            boolean_prototype: none,
            error_prototypes: [none; 7],
            eval_function: none,
            intrinsics: Vec::new(),
        }
    }

    pub(crate) fn roots(&self) -> impl Iterator<Item = ObjectId> + '_ {
        [
            self.global,
            self.object_prototype,
            self.function_prototype,
            self.array_prototype,
            self.string_prototype,
            self.number_prototype,
            self.boolean_prototype,
            self.eval_function,
        ]
        .into_iter()
        .chain(self.error_prototypes)
        .chain(self.intrinsics.iter().copied())
    }
}

/// Shared dispatch tables, one per class of object.
pub(crate) struct Classes {
    pub(crate) object: Rc<dyn ObjectClass>,
    pub(crate) global: Rc<dyn ObjectClass>,
    pub(crate) activation: Rc<dyn ObjectClass>,
    pub(crate) function: Rc<dyn ObjectClass>,
    pub(crate) native_function: Rc<dyn ObjectClass>,
    pub(crate) arguments: Rc<dyn ObjectClass>,
    pub(crate) array: Rc<dyn ObjectClass>,
    pub(crate) boolean: Rc<dyn ObjectClass>,
    pub(crate) number: Rc<dyn ObjectClass>,
    pub(crate) string: Rc<dyn ObjectClass>,
    pub(crate) error: Rc<dyn ObjectClass>,
    pub(crate) math: Rc<dyn ObjectClass>,
    pub(crate) dead: Rc<dyn ObjectClass>,
}

impl Classes {
    fn new() -> Self {
        Classes {
            object: Rc::new(NativeClass { name: "Object" }),
            global: Rc::new(NativeClass { name: "global" }),
            activation: Rc::new(NativeClass { name: "Activation" }),
            function: Rc::new(FunctionClass),
            native_function: Rc::new(NativeFunctionClass),
            arguments: Rc::new(ArgumentsClass),
            array: Rc::new(ArrayClass),
            boolean: Rc::new(NativeClass { name: "Boolean" }),
            number: Rc::new(NativeClass { name: "Number" }),
            string: Rc::new(NativeClass { name: "String" }),
            error: Rc::new(NativeClass { name: "Error" }),
            math: Rc::new(NativeClass { name: "Math" }),
            dead: Rc::new(DeadClass),
        }
    }
}

/// An ECMAScript interpreter instance. Single-threaded; may be re-entered
/// from native functions and host callbacks.
pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) interner: Interner,
    pub(crate) config: Config,
    pub(crate) realm: Realm,
    pub(crate) classes: Classes,
    pub(crate) contexts: Vec<Context>,
    pub(crate) try_regions: Vec<TryRegion>,
    pub(crate) recursion_remaining: Option<u32>,
    /// Script or native calls in progress.
    pub(crate) call_depth: u32,
    pub(crate) location: Location,
    pub(crate) traceback: Vec<TracebackEntry>,
    trace_hook: Option<TraceHook>,
    abort_hook: AbortHook,
    pub(crate) pins: FxHashMap<ObjectId, u32>,
    pub(crate) random_state: u64,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self::with_literals(LiteralTable::standard(), config)
    }

    /// Creates an interpreter whose interner is seeded from a shared
    /// literal table.
    pub fn with_literals(literals: Arc<LiteralTable>, config: Config) -> Self {
        let mut interp = Interpreter {
            heap: Heap::default(),
            interner: Interner::new(literals),
            recursion_remaining: config.recursion_limit,
            config,
            realm: Realm::placeholder(),
            classes: Classes::new(),
            contexts: Vec::new(),
            try_regions: Vec::new(),
            call_depth: 0,
            location: Location::new("<host>", 0),
            traceback: Vec::new(),
            trace_hook: None,
            abort_hook: default_abort,
            pins: FxHashMap::default(),
            random_state: 0x2545_f491_4f6c_dd1d,
        };
        interp.setup_globals();
        let global_context = interp.global_context(Attributes::DONT_DELETE);
        interp.contexts.push(global_context);
        interp
    }

    /// A fresh context running in the global scope.
    pub(crate) fn global_context(&self, var_attrs: Attributes) -> Context {
        let global = self.realm.global;
        Context {
            activation: None,
            variable: global,
            var_attrs,
            this: global,
            scope: Scope::empty().push(global),
            function: None,
            arguments: None,
            result: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn global_object(&self) -> ObjectId {
        self.realm.global
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            annex_b: self.config.compat.contains(CompatFlags::ANNEX_B),
            sgml_comments: self.config.compat.contains(CompatFlags::SGML_COMMENT),
        }
    }

    pub(crate) fn parse(&mut self, source_name: &str, source: &str) -> Result<Program, ParseError> {
        let options = self.parse_options();
        Parser::new(source, source_name, &mut self.interner, options)?.parse_program()
    }

    /// Parses the pieces handed to the `Function` constructor.
    pub(crate) fn parse_function(
        &mut self,
        source_name: &str,
        params: &str,
        body: &str,
    ) -> Result<Rc<FunctionLiteral>, ParseError> {
        let options = self.parse_options();
        let params = Parser::new(params, source_name, &mut self.interner, options)?.parse_parameter_text()?;
        Parser::new(body, source_name, &mut self.interner, options)?.parse_function_text(params)
    }

    pub(crate) fn run_body(&mut self, body: &FunctionBody) -> JsResult<Completion> {
        let strategy: &dyn ExecutionStrategy = match self.config.strategy {
            Strategy::TreeWalk => &TreeWalker,
            Strategy::Bytecode => &StackMachine,
        };
        strategy.execute(self, body)
    }

    /// Parses and runs a program in the global context, returning the value
    /// of its last expression statement.
    #[tracing::instrument(level = "debug", skip(self, source))]
    pub fn evaluate(&mut self, source_name: &str, source: &str) -> Result<Option<JsValue>, EngineError> {
        let program = self.parse(source_name, source)?;
        let body = program.body;
        let saved_location = std::mem::replace(
            &mut self.location,
            Location {
                source_name: body.source_name.clone(),
                line: 1,
            },
        );
        let context = self.global_context(Attributes::DONT_DELETE);
        self.contexts.push(context);
        let depth = self.contexts.len();
        let result = self.protect(|interp| {
            interp.bind_declarations(&body)?;
            interp.run_body(&body)
        });
        self.contexts.truncate(depth);
        let value = self.contexts.pop().and_then(|ctx| ctx.result);
        self.location = saved_location;
        match result {
            Ok(_) => Ok(value),
            Err(exception) => Err(self.uncaught(exception)),
        }
    }

    /// Calls `function` with `this` and `args` on behalf of the host.
    pub fn call(&mut self, function: ObjectId, this: JsValue, args: &[JsValue]) -> Result<JsValue, EngineError> {
        self.protect(|interp| interp.call_object(function, this, args))
            .map_err(|e| self.uncaught(e))
    }

    /// Constructs with `function` on behalf of the host.
    pub fn construct(&mut self, function: ObjectId, args: &[JsValue]) -> Result<JsValue, EngineError> {
        self.protect(|interp| interp.construct_object(function, args))
            .map_err(|e| self.uncaught(e))
    }

    pub fn set_trace_hook(&mut self, hook: Option<TraceHook>) {
        self.trace_hook = hook;
    }

    pub fn set_abort_hook(&mut self, hook: AbortHook) {
        self.abort_hook = hook;
    }

    /// Adds a non-enumerable binding to the global object.
    pub fn define_global(&mut self, name: &str, value: JsValue) {
        let name = self.intern(name);
        let global = self.realm.global;
        self.define_property(global, name, value, Attributes::DONT_ENUM);
    }

    /// Creates an object answering through a host-supplied class, carrying
    /// opaque host state.
    pub fn create_host_object(&mut self, class: Rc<dyn ObjectClass>, data: Box<dyn std::any::Any>) -> ObjectId {
        let proto = self.realm.object_prototype;
        self.new_object_with(class, Some(proto), ObjectKind::Host(data))
    }

    /// Keeps `obj` alive until a matching `unpin`.
    pub fn pin(&mut self, obj: ObjectId) {
        *self.pins.entry(obj).or_insert(0) += 1;
    }

    pub fn unpin(&mut self, obj: ObjectId) {
        if let Some(count) = self.pins.get_mut(&obj) {
            *count -= 1;
            if *count == 0 {
                self.pins.remove(&obj);
            }
        }
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }
}

#[cfg(test)]
mod tests;
