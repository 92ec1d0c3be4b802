use interpose::{
    forwarding_wrap, interposer_fn, Chain, ErasedCallable, Error, Invocation, Passthrough,
    ProxyFactory, Site, Value, ValueKind,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, PartialEq)]
struct Refused(&'static str);

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "refused: {}", self.0)
    }
}

impl std::error::Error for Refused {}

#[test]
fn test_identity_preserves_results() {
    let add = |a: i32, b: i32| a + b;
    let proxy = forwarding_wrap(Passthrough, add).unwrap();
    for (a, b) in [(0, 0), (2, 3), (-7, 7), (i32::MAX, 0)] {
        assert_eq!(proxy(a, b).unwrap(), add(a, b));
    }

    let describe = |name: String, n: u8, flag: bool, scale: f64| {
        format!("{}:{}:{}:{:.1}", name, n, flag, scale)
    };
    let proxy = forwarding_wrap(Passthrough, describe).unwrap();
    assert_eq!(
        proxy("x".to_string(), 3, true, 0.5).unwrap(),
        describe("x".to_string(), 3, true, 0.5)
    );

    let nullary = forwarding_wrap(Passthrough, || 42u64).unwrap();
    assert_eq!(nullary().unwrap(), 42);

    let tuple = forwarding_wrap(Passthrough, |p: (i16, i16)| (p.1, p.0)).unwrap();
    assert_eq!(tuple((1, 2)).unwrap(), (2, 1));
}

#[test]
fn test_eight_arguments() {
    let sum = |a: u8, b: u16, c: u32, d: u64, e: i8, f: i16, g: i32, h: i64| {
        a as i64 + b as i64 + c as i64 + d as i64 + e as i64 + f as i64 + g as i64 + h
    };
    let proxy = forwarding_wrap(Passthrough, sum).unwrap();
    assert_eq!(proxy(1, 2, 3, 4, 5, 6, 7, 8).unwrap(), 36);
}

#[test]
fn test_forward_once_keeps_side_effects() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let bump = move |by: usize| counter.fetch_add(by, Ordering::SeqCst) + by;

    let proxy = forwarding_wrap(interposer_fn(|inv| inv.forward()), bump).unwrap();
    assert_eq!(proxy(2).unwrap(), 2);
    assert_eq!(proxy(3).unwrap(), 5);
    assert_eq!(runs.load(Ordering::SeqCst), 5);
}

#[test]
fn test_short_circuit_never_runs_original() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let original = move |x: i32| {
        counter.fetch_add(1, Ordering::SeqCst);
        x
    };

    let proxy = forwarding_wrap(
        interposer_fn(|inv: &mut Invocation<'_>| inv.set_return(Value::I32(99))),
        original,
    )
    .unwrap();

    for x in 0..5 {
        assert_eq!(proxy(x).unwrap(), 99);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_rewrite_arguments_and_result() {
    let clamp_then_negate = interposer_fn(|inv| {
        let x: i32 = inv.arg(0)?;
        inv.set_argument(0, Value::I32(x.min(10)))?;
        inv.forward()?;
        let doubled: i32 = match inv.return_value() {
            Some(Value::I32(v)) => *v,
            _ => 0,
        };
        inv.set_return_as(-doubled)
    });

    let proxy = forwarding_wrap(clamp_then_negate, |x: i32| x * 2).unwrap();
    assert_eq!(proxy(3).unwrap(), -6);
    assert_eq!(proxy(50).unwrap(), -20);
}

#[test]
fn test_retry_reexecutes_original() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let flaky = ErasedCallable::from_raw("ii", move |args: &[Value]| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(Error::callable(Refused("busy")));
        }
        Ok(args[0].clone())
    });

    let retry = interposer_fn(|inv| {
        let mut last = None;
        for _ in 0..3 {
            match inv.forward() {
                Ok(()) => return Ok(()),
                Err(err) => last = Some(err),
            }
        }
        Err(last.unwrap_or_else(|| Error::callable("no attempts")))
    });

    let proxy = ProxyFactory::default().wrap(retry, flaky).unwrap();
    assert_eq!(proxy.invoke(vec![Value::I32(7)]).unwrap(), Value::I32(7));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(proxy.stats().forwards, 3);
}

#[test]
fn test_original_error_is_unchanged() {
    let failing = ErasedCallable::from_raw("v", |_: &[Value]| Err(Error::callable(Refused("closed"))));
    let proxy = ProxyFactory::default().wrap(Passthrough, failing).unwrap();

    let err = proxy.invoke(vec![]).unwrap_err();
    assert_eq!(err.downcast_ref::<Refused>(), Some(&Refused("closed")));
    assert_eq!(proxy.stats().failures, 1);
}

#[test]
fn test_interposer_error_is_unchanged() {
    let deny = interposer_fn(|_| Err(Error::callable(Refused("policy"))));
    let proxy = forwarding_wrap(deny, |x: u8| x).unwrap();

    let err = proxy(1).unwrap_err();
    assert_eq!(err.downcast_ref::<Refused>(), Some(&Refused("policy")));
}

#[test]
fn test_unresolved_return_is_reported() {
    let proxy = forwarding_wrap(interposer_fn(|_| Ok(())), |x: i64| x).unwrap();
    match proxy(1) {
        Err(Error::UnresolvedReturn { expected }) => assert_eq!(expected, ValueKind::I64),
        other => panic!("expected unresolved return, got {:?}", other),
    }

    // A void return needs no slot
    let quiet = forwarding_wrap(interposer_fn(|_| Ok(())), |_: i64| {}).unwrap();
    assert!(quiet(1).is_ok());
}

#[test]
fn test_wrong_return_kind_is_rejected() {
    let proxy = forwarding_wrap(
        interposer_fn(|inv| inv.set_return(Value::Str("nope".into()))),
        |x: i32| x,
    )
    .unwrap();

    let err = proxy(1).unwrap_err();
    assert!(matches!(err, Error::SignatureMismatch { site: Site::Return, .. }));
}

#[test]
fn test_unsupported_signature() {
    for encoding in ["", "i?", "v...", "i{}", "qv"] {
        let callable = ErasedCallable::from_raw(encoding, |_: &[Value]| Ok(Value::Void));
        let err = ProxyFactory::default().wrap(Passthrough, callable).unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedSignature { .. }),
            "{:?} produced {:?}",
            encoding,
            err
        );
    }
}

#[test]
fn test_chain_runs_outermost_first() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let layer = |name: &'static str, log: Arc<Mutex<Vec<String>>>| {
        interposer_fn(move |inv| {
            log.lock().push(format!("{} before", name));
            let result = inv.forward();
            log.lock().push(format!("{} after", name));
            result
        })
    };

    let chain = Chain::new()
        .with(layer("outer", log.clone()))
        .with(layer("inner", log.clone()));
    assert_eq!(chain.len(), 2);

    let proxy = forwarding_wrap(chain, |x: i32| x + 1).unwrap();
    assert_eq!(proxy(1).unwrap(), 2);
    assert_eq!(
        *log.lock(),
        vec!["outer before", "inner before", "inner after", "outer after"]
    );
}

#[test]
fn test_chain_layer_can_short_circuit() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();

    let chain = Chain::new()
        .with(Passthrough)
        .with(interposer_fn(|inv| inv.set_return_as(0i32)))
        .with(interposer_fn(|_| Err(Error::callable("unreachable layer"))));

    let proxy = forwarding_wrap(chain, move |x: i32| {
        counter.fetch_add(1, Ordering::SeqCst);
        x
    })
    .unwrap();

    assert_eq!(proxy(5).unwrap(), 0);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_nested_chains() {
    let add_one = || {
        interposer_fn(|inv| {
            inv.forward()?;
            let v: i32 = match inv.return_value() {
                Some(Value::I32(v)) => *v,
                _ => 0,
            };
            inv.set_return_as(v + 1)
        })
    };

    let inner = Chain::new().with(add_one()).with(add_one());
    let outer = Chain::new().with(add_one()).with(inner).with(add_one());

    let proxy = forwarding_wrap(outer, |x: i32| x).unwrap();
    assert_eq!(proxy(0).unwrap(), 4);

    let empty = forwarding_wrap(Chain::new(), |x: i32| x * 3).unwrap();
    assert_eq!(empty(3).unwrap(), 9);
}

#[test]
fn test_concurrent_calls_share_one_proxy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let proxy = forwarding_wrap(
        interposer_fn(move |inv| {
            seen.fetch_add(1, Ordering::SeqCst);
            inv.forward()
        }),
        |x: u64| x * x,
    )
    .unwrap();

    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let proxy = proxy.clone();
            thread::spawn(move || (0..100u64).map(|j| proxy(i + j).unwrap()).sum::<u64>())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected: u64 = (0..100u64).map(|j| (i as u64 + j).pow(2)).sum();
        assert_eq!(handle.join().unwrap(), expected);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 800);
}

#[test]
fn test_erased_proxy_signature_matches_original() {
    let typed = |a: f32, b: [u8; 2]| a as u64 + b[0] as u64;
    let proxy = ProxyFactory::default()
        .wrap(Passthrough, interpose::Callable::erase(typed))
        .unwrap();

    assert_eq!(proxy.signature().encoding(), "Qf[2]");
    assert_eq!(
        proxy.invoke(vec![Value::F32(1.0), Value::Blob(vec![2, 0])]).unwrap(),
        Value::U64(3)
    );
}
