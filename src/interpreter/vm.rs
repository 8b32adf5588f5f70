use super::*;
use crate::bytecode::{Address, Code, Op};
use smallvec::SmallVec;

/// Compiles bodies on first use and runs them on the stack machine.
pub(crate) struct StackMachine;

impl ExecutionStrategy for StackMachine {
    fn execute(&self, interp: &mut Interpreter, body: &FunctionBody) -> JsResult<Completion> {
        let fold = interp.config.constant_folding;
        let code = body
            .code
            .get_or_init(|| Rc::new(compile::compile_body(body, fold)))
            .clone();
        Frame::new(&code).run(interp)
    }
}

/// What to do once a finally block completes normally.
enum Pending {
    Jump { depth: u32, resume: Address },
    Return(JsValue),
    Throw(Exception),
}

enum Block {
    With { saved: Scope },
    Enum { object: ObjectId, names: Vec<Atom>, next: usize },
    TryCatch { handler: Address, param: Atom, stack_height: usize },
    TryFinally { handler: Address, stack_height: usize },
    Finally { pending: Pending, saved_result: Option<JsValue> },
}

enum Flow {
    Next,
    Halt(Completion),
}

struct Frame<'c> {
    code: &'c Code,
    pc: Address,
    stack: Vec<Operand>,
    blocks: Vec<Block>,
    argv: SmallVec<[JsValue; 8]>,
}

impl<'c> Frame<'c> {
    fn new(code: &'c Code) -> Self {
        Frame {
            code,
            pc: 0,
            stack: Vec::with_capacity(code.max_stack),
            blocks: Vec::with_capacity(code.max_blocks),
            argv: SmallVec::new(),
        }
    }

    fn run(&mut self, interp: &mut Interpreter) -> JsResult<Completion> {
        let code = self.code;
        loop {
            let Some(op) = code.ops.get(self.pc) else {
                return Ok(Completion::Normal);
            };
            self.pc += 1;
            match self.step(interp, op) {
                Ok(Flow::Next) => {}
                Ok(Flow::Halt(completion)) => return Ok(completion),
                Err(exception) => self.handle_exception(interp, exception)?,
            }
        }
    }

    fn push(&mut self, value: JsValue) {
        self.stack.push(Operand::Value(value));
    }

    fn pop(&mut self, interp: &Interpreter) -> Operand {
        match self.stack.pop() {
            Some(operand) => operand,
            None => interp.abort("operand stack underflow"),
        }
    }

    fn pop_value(&mut self, interp: &mut Interpreter) -> JsResult<JsValue> {
        let operand = self.pop(interp);
        interp.get_value(operand)
    }

    fn top_object(&self, interp: &Interpreter) -> ObjectId {
        match self.stack.last() {
            Some(Operand::Value(JsValue::Object(id))) => *id,
            _ => interp.abort("expected an object on the operand stack"),
        }
    }

    /// Moves the topmost `argc` values into the argument buffer.
    fn take_arguments(&mut self, interp: &mut Interpreter, argc: u32) -> JsResult<()> {
        let start = match self.stack.len().checked_sub(argc as usize) {
            Some(start) => start,
            None => interp.abort("operand stack underflow"),
        };
        self.argv.clear();
        for operand in self.stack.drain(start..) {
            self.argv.push(interp.get_value(operand)?);
        }
        Ok(())
    }

    fn step(&mut self, interp: &mut Interpreter, op: &Op) -> JsResult<Flow> {
        match op {
            Op::Pop => {
                self.pop(interp);
            }
            Op::Dup => {
                let top = self.pop(interp);
                self.stack.push(top.clone());
                self.stack.push(top);
            }
            Op::Exch => {
                let a = self.pop(interp);
                let b = self.pop(interp);
                self.stack.push(a);
                self.stack.push(b);
            }
            Op::Undefined => self.push(JsValue::Undefined),
            Op::Null => self.push(JsValue::Null),
            Op::Bool(b) => self.push(JsValue::Boolean(*b)),
            Op::Number(n) => self.push(JsValue::Number(*n)),
            Op::String(s) => self.push(JsValue::String(s.clone())),
            Op::This => {
                let this = interp.context().this;
                self.push(JsValue::Object(this));
            }
            Op::Lookup(name) => {
                let reference = interp.lookup(*name)?;
                self.stack.push(Operand::Reference(reference));
            }
            Op::Member(name) => {
                let base = self.pop_value(interp)?;
                let object = interp.to_object(&base)?;
                self.stack.push(Operand::Reference(Reference {
                    base: Some(object),
                    name: *name,
                }));
            }
            Op::MemberComputed => {
                let name = self.pop_value(interp)?;
                let base = self.pop_value(interp)?;
                let reference = interp.member_reference(&base, &name)?;
                self.stack.push(Operand::Reference(reference));
            }
            Op::GetValue => {
                let value = self.pop_value(interp)?;
                self.push(value);
            }
            Op::PutValue => {
                let value = self.pop_value(interp)?;
                let target = self.pop(interp);
                interp.put_value(&target, value.clone())?;
                self.push(value);
            }
            Op::PreIncrement | Op::PreDecrement | Op::PostIncrement | Op::PostDecrement => {
                let target = self.pop(interp);
                let delta = match op {
                    Op::PreIncrement | Op::PostIncrement => 1.0,
                    _ => -1.0,
                };
                let (old, new) = interp.update_operand(&target, delta)?;
                let result = match op {
                    Op::PreIncrement | Op::PreDecrement => new,
                    _ => old,
                };
                self.push(JsValue::Number(result));
            }
            Op::Negate => {
                let v = self.pop_value(interp)?;
                let n = interp.to_number(&v)?;
                self.push(JsValue::Number(-n));
            }
            Op::Plus => {
                let v = self.pop_value(interp)?;
                let n = interp.to_number(&v)?;
                self.push(JsValue::Number(n));
            }
            Op::Not => {
                let v = self.pop_value(interp)?;
                self.push(JsValue::Boolean(!to_boolean(&v)));
            }
            Op::BitNot => {
                let v = self.pop_value(interp)?;
                let n = interp.to_number(&v)?;
                self.push(JsValue::Number(crate::types::number_ops::bitwise_not(n)));
            }
            Op::Typeof => {
                let target = self.pop(interp);
                let name = interp.type_of_operand(target)?;
                self.push(JsValue::String(name));
            }
            Op::Delete => {
                let target = self.pop(interp);
                let deleted = interp.delete_operand(target)?;
                self.push(JsValue::Boolean(deleted));
            }
            Op::Binary(bop) => {
                let r = self.pop_value(interp)?;
                let l = self.pop_value(interp)?;
                let result = interp.binary_op(*bop, &l, &r)?;
                self.push(result);
            }
            Op::Call(argc) => {
                self.take_arguments(interp, *argc)?;
                let callee = self.pop(interp);
                let args = std::mem::take(&mut self.argv);
                let result = interp.call_operand(callee, &args);
                self.argv = args;
                self.push(result?);
            }
            Op::New(argc) => {
                self.take_arguments(interp, *argc)?;
                let callee = self.pop_value(interp)?;
                let args = std::mem::take(&mut self.argv);
                let result = interp.construct_value(&callee, &args);
                self.argv = args;
                self.push(result?);
            }
            Op::Function(index) => {
                let Some(literal) = self.code.functions.get(*index as usize) else {
                    interp.abort("function index out of range");
                };
                let func = interp.function_expression(literal);
                self.push(JsValue::Object(func));
            }
            Op::NewArray => {
                let array = interp.new_array();
                self.push(JsValue::Object(array));
            }
            Op::SetIndex(index) => {
                let value = self.pop_value(interp)?;
                let array = self.top_object(interp);
                let name = interp.index_atom(*index);
                interp.put(array, name, value)?;
            }
            Op::SetLength(length) => {
                let array = self.top_object(interp);
                interp.put(array, atoms::LENGTH, JsValue::Number(*length as f64))?;
            }
            Op::NewObject => {
                let object = interp.new_object();
                self.push(JsValue::Object(object));
            }
            Op::InitProperty(name) => {
                let value = self.pop_value(interp)?;
                let object = self.top_object(interp);
                interp.put(object, *name, value)?;
            }
            Op::Jump(target) => self.pc = *target,
            Op::JumpIfTrue(target) => {
                let v = self.pop_value(interp)?;
                if to_boolean(&v) {
                    self.pc = *target;
                }
            }
            Op::JumpIfFalse(target) => {
                let v = self.pop_value(interp)?;
                if !to_boolean(&v) {
                    self.pc = *target;
                }
            }
            Op::NextName(exit) => match self.next_name(interp)? {
                Some(name) => {
                    let name = interp.atom_string(name);
                    self.push(JsValue::String(name));
                }
                None => self.pc = *exit,
            },
            Op::SetResult => {
                let v = self.pop_value(interp)?;
                interp.set_result(v);
            }
            Op::Line { line, top_level } => {
                interp.location.line = *line;
                interp.trace(TraceEvent::Statement);
                if *top_level {
                    let roots = self.roots();
                    interp.maybe_collect(&roots);
                }
            }
            Op::EnterWith => {
                let v = self.pop_value(interp)?;
                let object = interp.to_object(&v)?;
                let scope = interp.current_scope().push(object);
                let saved = interp.replace_scope(scope);
                self.blocks.push(Block::With { saved });
            }
            Op::EnterEnum => {
                let v = self.pop_value(interp)?;
                let object = interp.to_object(&v)?;
                let names = interp.enumerate(object);
                self.blocks.push(Block::Enum {
                    object,
                    names,
                    next: 0,
                });
            }
            Op::EnterCatch { handler, param } => {
                interp.enter_region(RegionKind::Script);
                self.blocks.push(Block::TryCatch {
                    handler: *handler,
                    param: *param,
                    stack_height: self.stack.len(),
                });
            }
            Op::EnterFinally(handler) => {
                interp.enter_region(RegionKind::Script);
                self.blocks.push(Block::TryFinally {
                    handler: *handler,
                    stack_height: self.stack.len(),
                });
            }
            Op::Leave(depth) => {
                let resume = self.pc;
                return self.unwind(interp, *depth, Pending::Jump { depth: *depth, resume });
            }
            Op::EndFinally => {
                let Some(Block::Finally { pending, saved_result }) = self.blocks.pop() else {
                    interp.abort("finally block stack mismatch");
                };
                interp.context_mut().result = saved_result;
                return match pending {
                    Pending::Throw(exception) => Err(exception),
                    Pending::Jump { depth, resume } => self.unwind(interp, depth, Pending::Jump { depth, resume }),
                    Pending::Return(value) => self.unwind(interp, 0, Pending::Return(value)),
                };
            }
            Op::Return => {
                let value = self.pop_value(interp)?;
                return self.unwind(interp, 0, Pending::Return(value));
            }
            Op::Throw => {
                let value = self.pop_value(interp)?;
                interp.trace(TraceEvent::Throw);
                return Err(interp.throw_value(value));
            }
            Op::Halt => return Ok(Flow::Halt(Completion::Normal)),
        }
        Ok(Flow::Next)
    }

    /// Next name of the innermost enumeration that the object still has.
    fn next_name(&mut self, interp: &mut Interpreter) -> JsResult<Option<Atom>> {
        loop {
            let Some(Block::Enum { object, names, next }) = self.blocks.last_mut() else {
                interp.abort("no enumeration in progress");
            };
            let Some(name) = names.get(*next).copied() else {
                return Ok(None);
            };
            *next += 1;
            let object = *object;
            if interp.has_property(object, name)? {
                return Ok(Some(name));
            }
        }
    }

    /// Pops blocks down to `depth`. A try-finally block on the way diverts
    /// to its handler, carrying `pending` to resume with afterwards.
    fn unwind(&mut self, interp: &mut Interpreter, depth: u32, pending: Pending) -> JsResult<Flow> {
        while self.blocks.len() > depth as usize {
            let Some(block) = self.blocks.pop() else { break };
            match block {
                Block::With { saved } => {
                    interp.replace_scope(saved);
                }
                Block::Enum { .. } | Block::Finally { .. } => {}
                Block::TryCatch { .. } => interp.leave_region(false),
                Block::TryFinally { handler, .. } => {
                    interp.leave_region(false);
                    let saved_result = interp.context().result.clone();
                    self.blocks.push(Block::Finally { pending, saved_result });
                    self.pc = handler;
                    return Ok(Flow::Next);
                }
            }
        }
        match pending {
            Pending::Jump { resume, .. } => {
                self.pc = resume;
                Ok(Flow::Next)
            }
            Pending::Return(value) => Ok(Flow::Halt(Completion::Return(value))),
            Pending::Throw(exception) => Err(exception),
        }
    }

    /// Routes an exception to the innermost catch or finally block of this
    /// frame; with none left it propagates to the caller.
    fn handle_exception(&mut self, interp: &mut Interpreter, exception: Exception) -> JsResult<()> {
        while let Some(block) = self.blocks.pop() {
            match block {
                Block::With { saved } => {
                    interp.replace_scope(saved);
                }
                Block::Enum { .. } | Block::Finally { .. } => {}
                Block::TryCatch {
                    handler,
                    param,
                    stack_height,
                } => {
                    interp.leave_region(true);
                    self.stack.truncate(stack_height);
                    let holder = interp.new_object();
                    interp.define_property(holder, param, exception.value, Attributes::DONT_DELETE);
                    let scope = interp.current_scope().push(holder);
                    let saved = interp.replace_scope(scope);
                    self.blocks.push(Block::With { saved });
                    self.pc = handler;
                    return Ok(());
                }
                Block::TryFinally { handler, stack_height } => {
                    interp.leave_region(true);
                    self.stack.truncate(stack_height);
                    let saved_result = interp.context().result.clone();
                    self.blocks.push(Block::Finally {
                        pending: Pending::Throw(exception),
                        saved_result,
                    });
                    self.pc = handler;
                    return Ok(());
                }
            }
        }
        Err(exception)
    }

    /// Values held by this frame that the collector cannot see otherwise.
    fn roots(&self) -> Vec<JsValue> {
        let mut roots = Vec::new();
        for operand in &self.stack {
            match operand {
                Operand::Value(v) => roots.push(v.clone()),
                Operand::Reference(Reference { base: Some(b), .. }) => roots.push(JsValue::Object(*b)),
                Operand::Reference(_) => {}
            }
        }
        roots.extend(self.argv.iter().cloned());
        for block in &self.blocks {
            match block {
                Block::With { saved } => roots.extend(saved.objects().map(JsValue::Object)),
                Block::Enum { object, .. } => roots.push(JsValue::Object(*object)),
                Block::Finally { pending, saved_result } => {
                    roots.extend(saved_result.clone());
                    match pending {
                        Pending::Return(v) => roots.push(v.clone()),
                        Pending::Throw(e) => roots.push(e.value.clone()),
                        Pending::Jump { .. } => {}
                    }
                }
                Block::TryCatch { .. } | Block::TryFinally { .. } => {}
            }
        }
        roots
    }
}
