//! Tests for shared value types

use plugbridge_core::error::BridgeError;
use plugbridge_core::types::{PlugInitStruct, PluginName, PluginNameError, PLUGIN_NAME_SIZE, PLUG_SDKVERSION};
use plugbridge_core::{Address, CallbackType, PluginHandle};

#[test]
fn test_callback_type_codes_are_dense()
{
    assert_eq!(CallbackType::ALL.len(), CallbackType::COUNT);
    for (index, kind) in CallbackType::ALL.iter().enumerate() {
        assert_eq!(kind.index(), index);
        assert_eq!(CallbackType::from_raw(kind.raw()).unwrap(), *kind);
        assert!(kind.c_name().starts_with("CB_"));
    }
}

#[test]
fn test_callback_type_rejects_out_of_range()
{
    assert!(matches!(CallbackType::from_raw(-1), Err(BridgeError::InvalidEventType(-1))));
    assert!(matches!(CallbackType::from_raw(32), Err(BridgeError::InvalidEventType(32))));
}

#[test]
fn test_address_display_is_pointer_width()
{
    let addr = Address::new(0x1000);
    let width = std::mem::size_of::<usize>() * 2;
    assert_eq!(addr.to_string(), format!("0x{:0width$x}", 0x1000));
    assert!(Address::new(0).is_null());
    assert_eq!(usize::from(addr), 0x1000);
    assert_eq!(Address::new(usize::MAX).checked_add(1), None);
}

#[test]
fn test_plugin_handle_display()
{
    assert_eq!(PluginHandle::from(3).to_string(), "plugin#3");
    assert_eq!(PluginHandle(3).raw(), 3);
}

#[test]
fn test_plugin_name_limits()
{
    let longest = "a".repeat(PluginName::MAX_LEN);
    assert!(PluginName::new(longest.clone()).is_ok());
    assert_eq!(
        PluginName::new(format!("{longest}b")),
        Err(PluginNameError::TooLong {
            len: PLUGIN_NAME_SIZE,
            max: PluginName::MAX_LEN,
        })
    );
    assert_eq!(PluginName::new("bad\0name"), Err(PluginNameError::InteriorNul));
}

#[test]
fn test_plugin_name_truncates_on_char_boundary()
{
    // 'é' is two bytes, so the cut cannot land on MAX_LEN
    let name = "é".repeat(200);
    let truncated = PluginName::truncated(&name);
    assert_eq!(truncated.as_str().len(), PluginName::MAX_LEN - 1);
    assert_eq!(PluginName::truncated("head\0tail").as_str(), "head");
}

#[test]
fn test_plugin_name_buffer_keeps_terminator()
{
    let name = PluginName::truncated(&"a".repeat(400));
    let buffer = name.encode();
    assert_eq!(buffer[PLUGIN_NAME_SIZE - 1], 0);
    assert_eq!(PluginName::decode(&buffer), name);
}

#[test]
fn test_init_struct_round_trips_name()
{
    let mut init = PlugInitStruct {
        plugin_handle: 12,
        sdk_version: 0,
        plugin_version: 0,
        plugin_name: [0xFF; PLUGIN_NAME_SIZE],
    };
    let name = PluginName::new("ScyllaHide").unwrap();
    init.describe(&name, 4);

    assert_eq!(init.handle(), PluginHandle(12));
    assert_eq!(init.sdk_version, PLUG_SDKVERSION);
    assert_eq!(init.plugin_version, 4);
    assert_eq!(init.plugin_name(), name);
    assert!(init.plugin_name[name.as_str().len()..].iter().all(|&b| b == 0));
}
