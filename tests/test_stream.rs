use rivulet::{flows, sinks, sources, CancelToken, Execution, Source, StreamError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn collect<T: std::any::Any + Send>(source: Source) -> Vec<T> {
    source
        .run_with(&sinks::collect::<T>())
        .execute()
        .expect("pipeline failed")
        .single::<Vec<T>>()
        .expect("collect emits one vector")
}

#[test]
fn test_identity_flow_preserves_order() {
    let input: Vec<i32> = (0..50).collect();
    let out = collect::<i32>(sources::slice(input.clone()).via(flows::identity()));
    assert_eq!(out, input);
}

#[test]
fn test_take_emits_min_of_n_and_len() {
    for (n, len) in [(0u64, 5usize), (3, 5), (5, 5), (9, 5), (4, 0)] {
        let input: Vec<u32> = (0..len as u32).collect();
        let out = collect::<u32>(sources::slice(input.clone()).take(n));
        let expected: Vec<u32> = input.into_iter().take(n as usize).collect();
        assert_eq!(out, expected, "take({n}) over {len} items");
    }
}

#[test]
fn test_skip_emits_the_tail_in_order() {
    for (n, len) in [(0u64, 5usize), (2, 5), (5, 5), (9, 5), (3, 0)] {
        let input: Vec<u32> = (0..len as u32).collect();
        let out = collect::<u32>(sources::slice(input.clone()).skip(n));
        let expected: Vec<u32> = input.into_iter().skip(n as usize).collect();
        assert_eq!(out, expected, "skip({n}) over {len} items");
    }
}

#[test]
fn test_filter_examines_every_item_exactly_once() {
    let examined = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&examined);

    let input: Vec<u32> = (0..20).collect();
    let out = collect::<u32>(
        sources::slice(input.clone())
            .map(move |x: u32| {
                counter.fetch_add(1, Ordering::Relaxed);
                x
            })
            .filter(|x: &u32| x % 3 == 0),
    );

    let expected: Vec<u32> = input.iter().copied().filter(|x| x % 3 == 0).collect();
    assert_eq!(out, expected);
    assert_eq!(examined.load(Ordering::Relaxed), input.len());
}

#[test]
fn test_fold_emits_exactly_one_accumulated_value() {
    let out = collect::<String>(
        sources::slice(vec![1u8, 2, 3]).fold(String::from("#"), |acc: String, v: u8| {
            format!("{acc}{v}")
        }),
    );
    assert_eq!(out, vec!["#123".to_string()]);
}

#[test]
fn test_fold_of_an_empty_stream_emits_the_seed() {
    let out = collect::<u64>(sources::slice(Vec::<u8>::new()).fold(7u64, |acc: u64, v: u8| {
        acc + u64::from(v)
    }));
    assert_eq!(out, vec![7]);
}

#[test]
fn test_reduce_sums_from_the_zero_value() {
    let out = collect::<i64>(sources::slice(vec![1i64, 2, 3, 4]).reduce(|a: i64, b: i64| a + b));
    assert_eq!(out, vec![10]);
}

#[test]
fn test_map_filter_round_trip_matches_direct_computation() {
    let input: Vec<i32> = (-10..10).collect();
    let out = collect::<i32>(
        sources::slice(input.clone())
            .via(flows::map(|x: i32| x * x))
            .via(flows::filter(|x: &i32| *x > 4)),
    );
    let expected: Vec<i32> = input.iter().map(|x| x * x).filter(|x| *x > 4).collect();
    assert_eq!(out, expected);
}

#[test]
fn test_slice_take_collect_scenario() {
    let out = collect::<&str>(sources::slice(vec!["A", "B", "C"]).take(2));
    assert_eq!(out, vec!["A", "B"]);
}

#[test]
fn test_sequence_take_while_collect_scenario() {
    let out = collect::<u8>(sources::sequence(0u8).take_while(|x: &u8| *x < 5));
    assert_eq!(out, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_take_never_errors_on_an_endless_stream() {
    // an endless source, cut short; must end in completion, not an error
    let result = sources::sequence(0u64)
        .take(100)
        .run_with(&sinks::drain())
        .wait();
    assert_eq!(result, Ok(()));
}

#[test]
fn test_stage_error_reaches_the_caller() {
    let result = sources::slice(vec![1u32, 2, 3])
        .via(flows::try_map(|x: u32| {
            if x == 2 {
                Err(StreamError::stage("two is right out"))
            } else {
                Ok(x)
            }
        }))
        .run_with(&sinks::collect::<u32>())
        .execute();
    assert_eq!(result, Err(StreamError::stage("two is right out")));
}

#[test]
fn test_type_mismatch_names_both_types() {
    let result = sources::slice(vec![1u8, 2])
        .via(flows::map(|s: String| s.len()))
        .run_with(&sinks::drain())
        .wait();

    match result {
        Err(err @ StreamError::TypeMismatch { .. }) => {
            let msg = err.to_string();
            assert!(msg.contains("u8"), "actual type missing from {msg:?}");
            assert!(msg.contains("String"), "expected type missing from {msg:?}");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn test_cancellation_stops_the_stream_within_bounded_time() {
    let (token, handle) = CancelToken::manual();
    let out = sources::sequence(0u64)
        .run_with(&sinks::emit_each())
        .run_with_token(token);

    // let a few items through, then pull the plug
    for _ in 0..3 {
        let emit = out.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(emit.is_ok());
    }
    handle.cancel();

    let mut cancelled = false;
    while let Ok(emit) = out.recv_timeout(Duration::from_secs(5)) {
        match emit {
            Ok(_) => assert!(!cancelled, "item observed after cancellation"),
            Err(StreamError::Cancelled) => cancelled = true,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert!(cancelled);
}

#[test]
fn test_deadline_cancellation_from_execute() {
    let result = sources::sequence(0u64)
        .run_with(&sinks::drain())
        .execute_with_token(CancelToken::deadline(Duration::from_millis(20)));
    assert_eq!(result.unwrap_err(), StreamError::Cancelled);
}

#[test]
fn test_emit_each_streams_every_item() {
    let result = sources::slice(vec![10u8, 20, 30])
        .run_with(&sinks::emit_each())
        .execute()
        .unwrap();
    let values: Vec<u8> = result
        .items()
        .into_iter()
        .map(|item| item.downcast::<u8>().unwrap())
        .collect();
    assert_eq!(values, vec![10, 20, 30]);
}

#[test]
fn test_flow_to_sink_composition() {
    let doubled = flows::map(|x: u16| x * 2).to(sinks::collect::<u16>());
    let out = sources::slice(vec![1u16, 2, 3])
        .run_with(&doubled)
        .execute()
        .unwrap()
        .single::<Vec<u16>>()
        .unwrap();
    assert_eq!(out, vec![2, 4, 6]);
}

#[test]
fn test_a_source_can_run_more_than_once() {
    let source = sources::slice(vec![1u8, 2, 3]).take(2);
    let sink = sinks::collect::<u8>();
    for _ in 0..3 {
        let out = source
            .run_with(&sink)
            .execute()
            .unwrap()
            .single::<Vec<u8>>()
            .unwrap();
        assert_eq!(out, vec![1, 2]);
    }
}

#[test]
fn test_empty_pipeline_executes_to_empty() {
    let result = sources::slice(Vec::<u8>::new())
        .run_with(&sinks::drain())
        .execute()
        .unwrap();
    assert!(matches!(result, Execution::Empty));
}
