//! Tests for the expression function registry and its user data handles

mod common;

use std::sync::{Arc, Mutex};

use common::{bridge, PLUGIN};
use plugbridge_core::error::BridgeError;
use plugbridge_core::guard::contain;
use plugbridge_core::registry::ExprThunk;
use plugbridge_core::{OpaqueHandle, UserData};

#[derive(Debug, PartialEq)]
struct Scale(usize);

#[test]
fn test_words_function_receives_arguments_and_userdata()
{
    let (bridge, host, _sink) = bridge();
    let scale: Arc<UserData> = Arc::new(Scale(4));

    let accepted = bridge
        .expr_functions()
        .register(
            PLUGIN,
            "scaled",
            2,
            |args, data| {
                let factor = data.and_then(|d| d.downcast_ref::<Scale>()).map_or(1, |s| s.0);
                Ok((args[0] + args[1]) * factor)
            },
            Some(scale),
        )
        .unwrap();

    assert!(accepted);
    assert_eq!(bridge.handles().len(), 1);
    assert_eq!(bridge.expr_functions().arity("scaled"), Some(2));

    // The host was given the handle token, not a pointer
    let (_, token) = host.expr_function("scaled").unwrap();
    assert!(bridge.handles().resolve(OpaqueHandle::from_raw(token)).is_some());

    assert_eq!(bridge.expr_functions().evaluate("scaled", &[3, 7]).unwrap(), 40);
}

#[test]
fn test_null_userdata_is_observed_as_none()
{
    let (bridge, host, _sink) = bridge();
    let observed = Arc::new(Mutex::new(None));

    let recorder = Arc::clone(&observed);
    bridge
        .expr_functions()
        .register(
            PLUGIN,
            "plain",
            0,
            move |_, data| {
                *recorder.lock().unwrap() = Some(data.is_none());
                Ok(1)
            },
            None,
        )
        .unwrap();

    assert!(bridge.handles().is_empty());
    assert_eq!(host.expr_function("plain").map(|(_, token)| token), Some(0));
    assert_eq!(bridge.expr_functions().evaluate("plain", &[]).unwrap(), 1);
    assert_eq!(*observed.lock().unwrap(), Some(true));
}

#[test]
fn test_host_rejection_releases_handle()
{
    let (bridge, host, _sink) = bridge();
    let baseline = bridge.handles().len();

    host.reject_all(true);
    let accepted = bridge
        .expr_functions()
        .register(PLUGIN, "rejected", 1, |args, _| Ok(args[0]), Some(Arc::new(Scale(2))))
        .unwrap();

    assert!(!accepted);
    assert_eq!(bridge.handles().len(), baseline);
    assert!(!bridge.expr_functions().contains("rejected"));
}

#[test]
fn test_duplicate_name_does_not_leak_handle()
{
    let (bridge, _host, _sink) = bridge();
    let functions = bridge.expr_functions();

    assert!(functions.register(PLUGIN, "twice", 0, |_, _| Ok(1), Some(Arc::new(Scale(1)))).unwrap());
    assert!(!functions.register(PLUGIN, "twice", 0, |_, _| Ok(2), Some(Arc::new(Scale(2)))).unwrap());

    assert_eq!(bridge.handles().len(), 1);
    assert_eq!(functions.evaluate("twice", &[]).unwrap(), 1);
}

#[test]
fn test_unregister_releases_handle()
{
    let (bridge, host, _sink) = bridge();
    let functions = bridge.expr_functions();
    functions
        .register(PLUGIN, "temp", 0, |_, _| Ok(0), Some(Arc::new(Scale(9))))
        .unwrap();
    let (_, token) = host.expr_function("temp").unwrap();

    assert!(functions.unregister(PLUGIN, "temp").unwrap());
    assert!(bridge.handles().is_empty());
    assert!(bridge.handles().resolve(OpaqueHandle::from_raw(token)).is_none());
    assert!(matches!(
        functions.evaluate("temp", &[]),
        Err(BridgeError::UnknownFunction(name)) if name == "temp"
    ));
}

#[test]
fn test_unregister_unknown_name_fails()
{
    let (bridge, _host, _sink) = bridge();
    let result = bridge.expr_functions().unregister(PLUGIN, "ghost");
    assert!(matches!(result, Err(BridgeError::UnknownFunction(name)) if name == "ghost"));
}

#[test]
fn test_rejected_unregister_keeps_entry_and_handle()
{
    let (bridge, host, _sink) = bridge();
    bridge
        .expr_functions()
        .register(PLUGIN, "sticky", 0, |_, _| Ok(5), Some(Arc::new(Scale(5))))
        .unwrap();

    host.reject_all(true);
    assert!(!bridge.expr_functions().unregister(PLUGIN, "sticky").unwrap());
    assert_eq!(bridge.handles().len(), 1);
    assert_eq!(bridge.expr_functions().evaluate("sticky", &[]).unwrap(), 5);
}

#[test]
fn test_raw_shape_sees_untouched_buffer()
{
    let (bridge, _host, _sink) = bridge();
    bridge
        .expr_functions()
        .register_raw(
            PLUGIN,
            "rawsum",
            3,
            |args, _| Ok(usize::try_from(args.argc()).unwrap_or(0) * 1000 + args.iter().sum::<usize>()),
            None,
        )
        .unwrap();

    assert_eq!(bridge.expr_functions().evaluate("rawsum", &[1, 2, 3]).unwrap(), 3006);
}

#[test]
fn test_contract_violations()
{
    let (bridge, host, _sink) = bridge();
    let functions = bridge.expr_functions();

    let negative = functions.register(PLUGIN, "neg", -1, |_, _| Ok(0), None);
    assert!(matches!(negative, Err(BridgeError::InvalidArity(-1))));

    let unnamed = functions.register(PLUGIN, "", 0, |_, _| Ok(0), None);
    assert!(matches!(unnamed, Err(BridgeError::NullName)));

    let missing: Option<ExprThunk> = None;
    let result = functions.register_dyn(PLUGIN, "missing", 0, missing, Some(Arc::new(Scale(1))));
    assert!(matches!(result, Err(BridgeError::NullCallback)));

    // Nothing reached the host and nothing was anchored
    assert!(host.expr_function("neg").is_none());
    assert!(bridge.handles().is_empty());
}

#[test]
fn test_function_fault_returns_zero()
{
    let (bridge, _host, sink) = bridge();
    bridge
        .expr_functions()
        .register(PLUGIN, "div", 2, |args, _| Ok(args[0] / args[1]), None)
        .unwrap();

    assert_eq!(bridge.expr_functions().evaluate("div", &[10, 2]).unwrap(), 5);

    let result: usize = contain("expression function", &*sink, || bridge.expr_functions().evaluate("div", &[1, 0]));
    assert_eq!(result, 0);
    let faults = sink.faults();
    assert_eq!(faults.len(), 1);
    assert!(faults[0].starts_with("expression function: panicked"));
}
