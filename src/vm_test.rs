// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::*;
use crate::stream::{Immediate, Instruction, InstructionStream, StreamTable};

fn run_one(stream: InstructionStream) -> (Vm, StreamTable, HeapIndex) {
    let mut streams = StreamTable::new();
    let id = streams.insert(stream);
    let mut vm = Vm::new(Heap::new());
    let result = vm.run(&streams, id).unwrap();
    (vm, streams, result)
}

#[test]
fn pushn_leaves_a_number_on_the_stack() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(7.0)));
    stream.emit(Instruction::bare(Op::Stop));
    let (vm, _, result) = run_one(stream);
    assert_eq!(vm.heap.get(result), Object::Number(7.0));
}

#[test]
fn add_pops_two_numbers_and_pushes_their_sum() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(2.0)));
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(3.0)));
    stream.emit(Instruction::bare(Op::Add));
    stream.emit(Instruction::bare(Op::Stop));
    let (vm, _, result) = run_one(stream);
    assert_eq!(vm.heap.get(result), Object::Number(5.0));
}

#[test]
fn add_on_a_non_number_is_a_type_error() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(2.0)));
    stream.emit(Instruction::bare(Op::PushZ));
    stream.emit(Instruction::bare(Op::Add));
    stream.emit(Instruction::bare(Op::Stop));
    let mut streams = StreamTable::new();
    let id = streams.insert(stream);
    let mut vm = Vm::new(Heap::new());
    let err = vm.run(&streams, id).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::TypeError { op: "ADD", found: "null" }
    );
}

#[test]
fn comparisons_produce_interned_booleans() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(1.0)));
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(2.0)));
    stream.emit(Instruction::bare(Op::IsLt));
    stream.emit(Instruction::bare(Op::Stop));
    let (vm, _, result) = run_one(stream);
    assert_eq!(vm.heap.get(result), Object::Symbol(symbol::TRUE));
}

#[test]
fn cons_car_cdr_round_trip() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(10.0)));
    stream.emit(Instruction::bare(Op::PushZ));
    stream.emit(Instruction::bare(Op::Cons));
    stream.emit(Instruction::bare(Op::Car));
    stream.emit(Instruction::bare(Op::Stop));
    let (vm, _, result) = run_one(stream);
    assert_eq!(vm.heap.get(result), Object::Number(10.0));
}

#[test]
fn car_on_a_non_list_is_a_type_error() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(1.0)));
    stream.emit(Instruction::bare(Op::Car));
    stream.emit(Instruction::bare(Op::Stop));
    let mut streams = StreamTable::new();
    let id = streams.insert(stream);
    let mut vm = Vm::new(Heap::new());
    let err = vm.run(&streams, id).unwrap_err();
    assert_eq!(err, RuntimeError::TypeError { op: "car", found: "number" });
}

#[test]
fn isnull_distinguishes_nil_from_cons() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::bare(Op::PushZ));
    stream.emit(Instruction::bare(Op::IsNull));
    stream.emit(Instruction::bare(Op::Stop));
    let (vm, _, result) = run_one(stream);
    assert_eq!(vm.heap.get(result), Object::Symbol(symbol::TRUE));
}

#[test]
fn call_and_ret_round_trip_through_getag() {
    // stream 0 (lambda body): GETAG 0; RET -- the identity function.
    let mut body = InstructionStream::new();
    body.emit(Instruction::new(Op::Getag, Immediate::Offset(0)));
    body.emit(Instruction::bare(Op::Ret));

    // stream 1 (call site): PUSHN 42; PUSHL <body>; CALL; CLOSE 1; STOP.
    let mut main = InstructionStream::new();
    main.emit(Instruction::new(Op::PushN, Immediate::Number(42.0)));

    let mut streams = StreamTable::new();
    let body_id = streams.insert(body);
    main.emit(Instruction::new(Op::PushL, Immediate::Offset(body_id.raw())));
    main.emit(Instruction::bare(Op::Call));
    main.emit(Instruction::new(Op::Close, Immediate::Offset(1)));
    main.emit(Instruction::bare(Op::Stop));
    let main_id = streams.insert(main);

    let mut vm = Vm::new(Heap::new());
    let result = vm.run(&streams, main_id).unwrap();
    assert_eq!(vm.heap.get(result), Object::Number(42.0));
    assert_eq!(vm.data_stack.len(), 1, "CLOSE collapses back down to one value");
}

#[test]
fn ret_with_an_empty_call_stack_halts_the_vm() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(1.0)));
    stream.emit(Instruction::bare(Op::Ret));
    let (vm, _, result) = run_one(stream);
    assert_eq!(vm.heap.get(result), Object::Number(1.0));
}

#[test]
fn call_on_a_non_lambda_is_a_type_error() {
    let mut stream = InstructionStream::new();
    stream.emit(Instruction::new(Op::PushN, Immediate::Number(1.0)));
    stream.emit(Instruction::bare(Op::Call));
    stream.emit(Instruction::bare(Op::Stop));
    let mut streams = StreamTable::new();
    let id = streams.insert(stream);
    let mut vm = Vm::new(Heap::new());
    let err = vm.run(&streams, id).unwrap_err();
    assert_eq!(err, RuntimeError::TypeError { op: "call", found: "number" });
}

#[test]
fn getgl_addresses_an_absolute_data_stack_slot() {
    // Simulate a prior global define occupying slot 0, then a second
    // stream that reads it back via GETGL 0.
    let mut streams = StreamTable::new();
    let mut vm = Vm::new(Heap::new());

    let mut define_stream = InstructionStream::new();
    define_stream.emit(Instruction::new(Op::PushN, Immediate::Number(99.0)));
    define_stream.emit(Instruction::bare(Op::Stop));
    let define_id = streams.insert(define_stream);
    vm.run(&streams, define_id).unwrap();

    let mut use_stream = InstructionStream::new();
    use_stream.emit(Instruction::new(Op::Getgl, Immediate::Offset(0)));
    use_stream.emit(Instruction::bare(Op::Stop));
    let use_id = streams.insert(use_stream);

    // GETGL addresses absolutely, so the define's value must still be at
    // data_stack[0] for this to resolve -- model that directly rather than
    // going through the driver (which isn't this module's concern).
    vm.data_stack.truncate(1);
    let result = vm.run(&streams, use_id).unwrap();
    assert_eq!(vm.heap.get(result), Object::Number(99.0));
}

#[test]
fn thunk_forcing_memoizes_the_result_in_place() {
    let mut streams = StreamTable::new();

    let mut thunk_stream = InstructionStream::new();
    thunk_stream.emit(Instruction::new(Op::PushN, Immediate::Number(2.0)));
    thunk_stream.emit(Instruction::new(Op::PushN, Immediate::Number(3.0)));
    thunk_stream.emit(Instruction::bare(Op::Add));
    thunk_stream.emit(Instruction::bare(Op::Stop));
    let thunk_stream_id = streams.insert(thunk_stream);

    let mut vm = Vm::new(Heap::new());
    let thunk_index = vm
        .heap
        .alloc(Object::Thunk { stream: thunk_stream_id })
        .unwrap();

    vm.force(&streams, thunk_index).unwrap();
    assert_eq!(vm.heap.get(thunk_index), Object::Number(5.0));

    // Forcing again is a no-op: the object is no longer a thunk.
    vm.force(&streams, thunk_index).unwrap();
    assert_eq!(vm.heap.get(thunk_index), Object::Number(5.0));
}

#[test]
fn forcing_a_thunk_mid_instruction_does_not_disturb_the_caller() {
    // ADD forces both of its operands; feed it one eager number and one
    // thunk, and confirm the caller's own stream resumes correctly
    // afterward instead of running off the end of the thunk's stream.
    let mut streams = StreamTable::new();

    let mut thunk_stream = InstructionStream::new();
    thunk_stream.emit(Instruction::new(Op::PushN, Immediate::Number(4.0)));
    thunk_stream.emit(Instruction::bare(Op::Stop));
    let thunk_stream_id = streams.insert(thunk_stream);

    let mut vm = Vm::new(Heap::new());
    let thunk_index = vm
        .heap
        .alloc(Object::Thunk { stream: thunk_stream_id })
        .unwrap();

    let mut main = InstructionStream::new();
    main.emit(Instruction::new(Op::PushN, Immediate::Number(1.0)));
    // ADD, then a further instruction the caller must still reach.
    main.emit(Instruction::bare(Op::Add));
    main.emit(Instruction::new(Op::PushN, Immediate::Number(100.0)));
    main.emit(Instruction::bare(Op::Add));
    main.emit(Instruction::bare(Op::Stop));
    let main_id = streams.insert(main);

    vm.data_stack.push(thunk_index);
    let result = vm.run(&streams, main_id).unwrap();
    assert_eq!(vm.heap.get(result), Object::Number(105.0));
}

#[test]
fn data_stack_exhaustion_is_reported() {
    let mut stream = InstructionStream::new();
    for _ in 0..=DEFAULT_DATA_STACK_CAPACITY {
        stream.emit(Instruction::new(Op::PushN, Immediate::Number(1.0)));
    }
    stream.emit(Instruction::bare(Op::Stop));
    let mut streams = StreamTable::new();
    let id = streams.insert(stream);
    let mut vm = Vm::new(Heap::new());
    let err = vm.run(&streams, id).unwrap_err();
    assert_eq!(err, RuntimeError::DataStackExhausted);
}

proptest::proptest! {
    /// Every value a chain of `ADD`/`SUB`/`MUL` leaves on the data stack
    /// is a heap index the heap actually allocated.
    #[test]
    fn arithmetic_chains_never_push_an_out_of_bounds_heap_index(
        first in -100.0f64..100.0,
        rest in proptest::collection::vec((-100.0f64..100.0, 0..3u8), 0..16),
    ) {
        let mut stream = InstructionStream::new();
        stream.emit(Instruction::new(Op::PushN, Immediate::Number(first)));
        for (n, op) in &rest {
            stream.emit(Instruction::new(Op::PushN, Immediate::Number(*n)));
            let op = match op {
                0 => Op::Add,
                1 => Op::Sub,
                _ => Op::Mul,
            };
            stream.emit(Instruction::bare(op));
        }
        stream.emit(Instruction::bare(Op::Stop));

        let mut streams = StreamTable::new();
        let id = streams.insert(stream);
        let mut vm = Vm::new(Heap::new());
        let result = vm.run(&streams, id).unwrap();
        assert!(result.raw() < vm.heap.used());
        for &index in &vm.data_stack {
            assert!(index.raw() < vm.heap.used());
        }
    }

    /// `CALL` followed by `CLOSE n` always leaves the data stack exactly
    /// one value taller than it was at the call site, regardless of how
    /// many arguments `n` collapses away.
    #[test]
    fn call_close_round_trip_leaves_exactly_one_result(arity in 0usize..6, value in -100.0f64..100.0) {
        // Identity-shaped body: ignores its arguments, returns `value`.
        let mut body = InstructionStream::new();
        body.emit(Instruction::new(Op::PushN, Immediate::Number(value)));
        body.emit(Instruction::bare(Op::Ret));

        let mut streams = StreamTable::new();
        let body_id = streams.insert(body);

        let mut main = InstructionStream::new();
        for i in 0..arity {
            main.emit(Instruction::new(Op::PushN, Immediate::Number(i as f64)));
        }
        main.emit(Instruction::new(Op::PushL, Immediate::Offset(body_id.raw())));
        main.emit(Instruction::bare(Op::Call));
        main.emit(Instruction::new(Op::Close, Immediate::Offset(arity)));
        main.emit(Instruction::bare(Op::Stop));
        let main_id = streams.insert(main);

        let mut vm = Vm::new(Heap::new());
        let entry_size = vm.data_stack.len();
        let result = vm.run(&streams, main_id).unwrap();
        assert_eq!(vm.data_stack.len(), entry_size + 1);
        assert_eq!(vm.heap.get(result), Object::Number(value));
    }
}
