//! Tests for debug event and callback payload decoding

use std::ptr;

use libc::c_void;
use plugbridge_core::error::BridgeError;
use plugbridge_core::events::layout::{
    RawDebugEvent, RawDebugEventUnion, RawExceptionDebugInfo, RawExceptionRecord, RawLoadDllDebugInfo,
    RawOutputDebugStringInfo, RawRipInfo, EXCEPTION_MAXIMUM_PARAMETERS,
};
use plugbridge_core::events::{DebugEvent, DebugEventCode, DebugEventPayload, MAX_EXCEPTION_CHAIN_DEPTH};
use plugbridge_core::payload::{CallbackInfo, PlugCbDebugEvent, PlugCbException, PlugCbLoadDll};
use plugbridge_core::{Address, CallbackType};

const ACCESS_VIOLATION: u32 = 0xC000_0005;

fn record(code: u32, params: &[usize], number_parameters: u32) -> RawExceptionRecord
{
    // Stale data past the declared count must never be read
    let mut exception_information = [0xDEAD_BEEF_usize; EXCEPTION_MAXIMUM_PARAMETERS];
    exception_information[..params.len()].copy_from_slice(params);
    RawExceptionRecord {
        exception_code: code,
        exception_flags: 0,
        exception_record: ptr::null(),
        exception_address: 0x7FF6_1000,
        number_parameters,
        exception_information,
    }
}

fn exception_event(raw: RawExceptionRecord) -> RawDebugEvent
{
    RawDebugEvent {
        debug_event_code: DebugEventCode::Exception.raw(),
        process_id: 100,
        thread_id: 200,
        u: RawDebugEventUnion {
            exception: RawExceptionDebugInfo {
                exception_record: raw,
                first_chance: 1,
            },
        },
    }
}

fn decode(event: &RawDebugEvent) -> DebugEvent<'_>
{
    unsafe { DebugEvent::from_raw(event) }.unwrap()
}

#[test]
fn test_parameter_reads_clamp_to_declared_count()
{
    let raw = exception_event(record(ACCESS_VIOLATION, &[1, 0x1234, 0x5678], 3));
    let event = decode(&raw);
    assert_eq!(event.code(), DebugEventCode::Exception);
    assert_eq!((event.process_id, event.thread_id), (100, 200));

    let DebugEventPayload::Exception(info) = event.payload else {
        panic!("expected an exception payload");
    };
    assert!(info.first_chance);
    assert_eq!(info.record.code(), ACCESS_VIOLATION);
    assert_eq!(info.record.address(), Address::new(0x7FF6_1000));
    assert_eq!(info.record.parameter_count(), 3);

    assert_eq!(info.record.parameters(5), [1, 0x1234, 0x5678, 0, 0]);
    assert_eq!(info.record.parameters(2), [1, 0x1234]);

    let mut dest = [9usize; 4];
    assert_eq!(info.record.fill_parameters(&mut dest), 3);
    assert_eq!(dest, [1, 0x1234, 0x5678, 9]);
}

#[test]
fn test_declared_count_above_fifteen_is_capped()
{
    let params: Vec<usize> = (1..=15).collect();
    let raw = exception_event(record(ACCESS_VIOLATION, &params, 40));
    let DebugEventPayload::Exception(info) = decode(&raw).payload else {
        panic!("expected an exception payload");
    };

    assert_eq!(info.record.number_parameters(), 40);
    assert_eq!(info.record.parameter_count(), EXCEPTION_MAXIMUM_PARAMETERS);
    let values = info.record.parameters(20);
    assert_eq!(&values[..15], params.as_slice());
    assert!(values[15..].iter().all(|&v| v == 0));
}

#[test]
fn test_exception_chain_is_followed_one_link_at_a_time()
{
    let root = record(0xC000_0094, &[], 0);
    let mut middle = record(0xE06D_7363, &[0x1993_0520], 1);
    middle.exception_record = &root;
    let mut top = record(ACCESS_VIOLATION, &[0, 0], 2);
    top.exception_record = &middle;
    top.exception_flags = 1;

    let raw = exception_event(top);
    let DebugEventPayload::Exception(info) = decode(&raw).payload else {
        panic!("expected an exception payload");
    };

    assert!(info.record.is_noncontinuable());
    let parent = info.record.parent().unwrap();
    assert_eq!(parent.code(), 0xE06D_7363);
    assert_eq!(parent.parameters(1), [0x1993_0520]);
    assert!(parent.has_parent());

    let codes: Vec<u32> = info.record.chain().map(|r| r.code()).collect();
    assert_eq!(codes, [ACCESS_VIOLATION, 0xE06D_7363, 0xC000_0094]);
}

#[test]
fn test_cyclic_chain_stops_at_depth_cap()
{
    let mut looping = Box::new(record(ACCESS_VIOLATION, &[], 0));
    let self_ptr: *const RawExceptionRecord = &*looping;
    looping.exception_record = self_ptr;

    let raw = exception_event(*looping);
    let DebugEventPayload::Exception(info) = decode(&raw).payload else {
        panic!("expected an exception payload");
    };
    assert_eq!(info.record.chain().count(), MAX_EXCEPTION_CHAIN_DEPTH);
}

#[test]
fn test_load_dll_decodes_utf16_name()
{
    let name: Vec<u16> = "C:\\Windows\\System32\\kernel32.dll\0".encode_utf16().collect();
    let raw = RawDebugEvent {
        debug_event_code: DebugEventCode::LoadDll.raw(),
        process_id: 1,
        thread_id: 2,
        u: RawDebugEventUnion {
            load_dll: RawLoadDllDebugInfo {
                h_file: 0x44,
                base_of_dll: 0x7FFA_0000,
                debug_info_file_offset: 0,
                debug_info_size: 0,
                image_name: name.as_ptr().cast::<c_void>(),
                unicode: 1,
            },
        },
    };

    let DebugEventPayload::LoadDll(info) = decode(&raw).payload else {
        panic!("expected a load-dll payload");
    };
    assert_eq!(info.base_of_dll, Address::new(0x7FFA_0000));
    assert_eq!(info.image_name.as_deref(), Some("C:\\Windows\\System32\\kernel32.dll"));
    assert!(info.unicode);
}

#[test]
fn test_output_debug_string_honours_length()
{
    let text = b"checkpoint reached\0tail";
    let raw = RawDebugEvent {
        debug_event_code: DebugEventCode::OutputDebugString.raw(),
        process_id: 1,
        thread_id: 2,
        u: RawDebugEventUnion {
            debug_string: RawOutputDebugStringInfo {
                debug_string_data: text.as_ptr().cast::<c_void>(),
                unicode: 0,
                debug_string_length: 19,
            },
        },
    };

    let DebugEventPayload::OutputDebugString(info) = decode(&raw).payload else {
        panic!("expected an output-debug-string payload");
    };
    assert_eq!(info.text.as_deref(), Some("checkpoint reached"));
}

#[test]
fn test_utf16_debug_string_length_is_in_bytes()
{
    let text: Vec<u16> = "wide\0JUNKJUNK\0".encode_utf16().collect();
    let raw = RawDebugEvent {
        debug_event_code: DebugEventCode::OutputDebugString.raw(),
        process_id: 1,
        thread_id: 2,
        u: RawDebugEventUnion {
            debug_string: RawOutputDebugStringInfo {
                debug_string_data: text.as_ptr().cast::<c_void>(),
                unicode: 1,
                // "wide\0" as UTF-16
                debug_string_length: 10,
            },
        },
    };

    let DebugEventPayload::OutputDebugString(info) = decode(&raw).payload else {
        panic!("expected an output-debug-string payload");
    };
    assert!(info.unicode);
    assert_eq!(info.text.as_deref(), Some("wide"));

    // A length running past the terminator still stops at it
    let mut raw = raw;
    raw.u.debug_string = RawOutputDebugStringInfo {
        debug_string_data: text.as_ptr().cast::<c_void>(),
        unicode: 1,
        debug_string_length: 28,
    };
    let DebugEventPayload::OutputDebugString(info) = decode(&raw).payload else {
        panic!("expected an output-debug-string payload");
    };
    assert_eq!(info.text.as_deref(), Some("wide"));
}

#[test]
fn test_rip_event()
{
    let raw = RawDebugEvent {
        debug_event_code: DebugEventCode::Rip.raw(),
        process_id: 1,
        thread_id: 2,
        u: RawDebugEventUnion {
            rip_info: RawRipInfo { error: 87, kind: 1 },
        },
    };
    let DebugEventPayload::Rip(info) = decode(&raw).payload else {
        panic!("expected a rip payload");
    };
    assert_eq!((info.error, info.kind), (87, 1));
}

#[test]
fn test_unknown_code_is_rejected_before_reading_payload()
{
    let mut raw = exception_event(record(ACCESS_VIOLATION, &[], 0));
    raw.debug_event_code = 42;
    assert!(matches!(
        unsafe { DebugEvent::from_raw(&raw) },
        Err(BridgeError::UnknownDebugEvent(42))
    ));

    // An unknown code fails even when the union pointer is null
    assert!(matches!(
        unsafe { DebugEventPayload::decode(0, ptr::null()) },
        Err(BridgeError::UnknownDebugEvent(0))
    ));
    assert!(matches!(
        unsafe { DebugEventPayload::decode(1, ptr::null()) },
        Err(BridgeError::NullPayload(_))
    ));
    assert!(matches!(
        unsafe { DebugEvent::from_raw(ptr::null()) },
        Err(BridgeError::NullPayload(_))
    ));
}

#[test]
fn test_event_codes_round_trip_through_try_from()
{
    for code in DebugEventCode::ALL {
        assert_eq!(DebugEventCode::try_from(code.raw()).unwrap(), code);
    }
    assert!(DebugEventCode::try_from(10).is_err());
}

#[test]
fn test_callback_info_decodes_debug_event_and_exception()
{
    let raw = exception_event(record(ACCESS_VIOLATION, &[1, 0x10], 2));

    let mut payload = PlugCbDebugEvent { debug_event: &raw };
    let info = unsafe { CallbackInfo::from_raw(CallbackType::DebugEvent, (&mut payload as *mut PlugCbDebugEvent).cast()) };
    assert_eq!(info.debug_event().unwrap().code(), DebugEventCode::Exception);
    assert!(matches!(info.exception(), Err(BridgeError::PayloadMismatch { .. })));

    let exception = unsafe { raw.u.exception };
    let mut payload = PlugCbException { exception: &exception };
    let info = unsafe { CallbackInfo::from_raw(CallbackType::Exception, (&mut payload as *mut PlugCbException).cast()) };
    let decoded = info.exception().unwrap();
    assert_eq!(decoded.record.parameters(3), [1, 0x10, 0]);
}

#[test]
fn test_callback_info_null_payloads()
{
    let info = unsafe { CallbackInfo::from_raw(CallbackType::LoadDll, ptr::null_mut()) };
    assert!(matches!(info.load_dll(), Err(BridgeError::NullPayload("CB_LOADDLL"))));

    let mut payload = PlugCbLoadDll {
        load_dll: ptr::null(),
        mod_info: ptr::null(),
        mod_name: ptr::null(),
    };
    let info = unsafe { CallbackInfo::from_raw(CallbackType::LoadDll, (&mut payload as *mut PlugCbLoadDll).cast()) };
    assert!(matches!(info.load_dll(), Err(BridgeError::NullPayload("LOAD_DLL_DEBUG_INFO"))));
}
