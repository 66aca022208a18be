//! Plugin identity: handles, the bounded plugin name, and the init/setup
//! structures exchanged with the host at load time.

use std::fmt;

use libc::{c_int, c_void};

/// SDK version this bridge speaks (`PLUG_SDKVERSION`).
pub const PLUG_SDKVERSION: c_int = 1;

/// Size of the inline plugin name buffer in [`PlugInitStruct`].
pub const PLUGIN_NAME_SIZE: usize = 256;

/// Handle the host assigned to this plugin.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginHandle(pub c_int);

impl PluginHandle
{
    /// Get the raw handle value
    #[must_use]
    pub const fn raw(self) -> c_int
    {
        self.0
    }
}

impl From<c_int> for PluginHandle
{
    fn from(value: c_int) -> Self
    {
        Self(value)
    }
}

impl fmt::Display for PluginHandle
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "plugin#{}", self.0)
    }
}

/// Handle of a host menu (plugin root menu or a submenu).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuHandle(pub c_int);

/// Plugin-chosen identifier of a menu entry, echoed back in `CB_MENUENTRY`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuEntryId(pub c_int);

/// Why a string cannot become a [`PluginName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginNameError
{
    /// Longer than the inline buffer allows (one byte is kept for the NUL).
    #[error("Plugin name is {len} bytes, at most {max} fit")]
    TooLong
    {
        /// Length of the rejected name in bytes
        len: usize,
        /// Maximum encodable length in bytes
        max: usize,
    },
    /// C consumers would see a shorter name.
    #[error("Plugin name contains an interior NUL byte")]
    InteriorNul,
}

/// Plugin name bounded to the host's fixed 256-byte buffer.
///
/// The encoded form is UTF-8 followed by at least one NUL, so at most
/// [`PluginName::MAX_LEN`] bytes of text fit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginName(String);

impl PluginName
{
    /// Maximum length in bytes of the text part.
    pub const MAX_LEN: usize = PLUGIN_NAME_SIZE - 1;

    /// Create a name, rejecting anything that would not round-trip.
    ///
    /// ## Errors
    ///
    /// - `TooLong`: more than [`Self::MAX_LEN`] bytes
    /// - `InteriorNul`: contains `\0`
    pub fn new(name: impl Into<String>) -> Result<Self, PluginNameError>
    {
        let name = name.into();
        if name.contains('\0') {
            return Err(PluginNameError::InteriorNul);
        }
        if name.len() > Self::MAX_LEN {
            return Err(PluginNameError::TooLong {
                len: name.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(name))
    }

    /// Create a name, cutting at the first NUL and truncating to
    /// [`Self::MAX_LEN`] bytes on a character boundary.
    #[must_use]
    pub fn truncated(name: &str) -> Self
    {
        let name = name.split('\0').next().unwrap_or_default();
        let mut end = name.len().min(Self::MAX_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Self(name[..end].to_owned())
    }

    /// The name as text.
    #[must_use]
    pub fn as_str(&self) -> &str
    {
        &self.0
    }

    /// Encode into a fixed buffer; the remainder is zero-filled.
    #[must_use]
    pub fn encode(&self) -> [u8; PLUGIN_NAME_SIZE]
    {
        let mut buffer = [0u8; PLUGIN_NAME_SIZE];
        buffer[..self.0.len()].copy_from_slice(self.0.as_bytes());
        buffer
    }

    /// Decode from a fixed buffer, stopping at the first NUL.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the buffer is written
    /// by C code.
    #[must_use]
    pub fn decode(buffer: &[u8; PLUGIN_NAME_SIZE]) -> Self
    {
        let end = buffer.iter().position(|&b| b == 0).unwrap_or(Self::MAX_LEN).min(Self::MAX_LEN);
        Self::truncated(&String::from_utf8_lossy(&buffer[..end]))
    }
}

impl fmt::Display for PluginName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.0)
    }
}

/// `PLUG_INITSTRUCT`: filled in by the plugin during `pluginit`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PlugInitStruct
{
    /// Set by the host before the call
    pub plugin_handle: c_int,
    /// Set by the plugin to [`PLUG_SDKVERSION`]
    pub sdk_version: c_int,
    /// Plugin-defined version
    pub plugin_version: c_int,
    /// NUL-terminated UTF-8 plugin name
    pub plugin_name: [u8; PLUGIN_NAME_SIZE],
}

impl PlugInitStruct
{
    /// Fill in the plugin-provided fields.
    pub fn describe(&mut self, name: &PluginName, plugin_version: c_int)
    {
        self.sdk_version = PLUG_SDKVERSION;
        self.plugin_version = plugin_version;
        self.plugin_name = name.encode();
    }

    /// Handle the host assigned to the plugin.
    #[must_use]
    pub fn handle(&self) -> PluginHandle
    {
        PluginHandle(self.plugin_handle)
    }

    /// Decode the inline name buffer.
    #[must_use]
    pub fn plugin_name(&self) -> PluginName
    {
        PluginName::decode(&self.plugin_name)
    }
}

impl fmt::Debug for PlugInitStruct
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("PlugInitStruct")
            .field("plugin_handle", &self.plugin_handle)
            .field("sdk_version", &self.sdk_version)
            .field("plugin_version", &self.plugin_version)
            .field("plugin_name", &self.plugin_name())
            .finish()
    }
}

/// `PLUG_SETUPSTRUCT`: menu handles handed to the plugin during `plugsetup`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlugSetupStruct
{
    /// Host main window (`HWND`)
    pub hwnd_dlg: *mut c_void,
    /// Plugin menu in the main menu bar
    pub h_menu: c_int,
    /// Plugin submenu of the disassembly context menu
    pub h_menu_disasm: c_int,
    /// Plugin submenu of the dump context menu
    pub h_menu_dump: c_int,
    /// Plugin submenu of the stack context menu
    pub h_menu_stack: c_int,
}

impl PlugSetupStruct
{
    /// Plugin menu in the main menu bar.
    #[must_use]
    pub fn main_menu(&self) -> MenuHandle
    {
        MenuHandle(self.h_menu)
    }

    /// Disassembly view context menu.
    #[must_use]
    pub fn disasm_menu(&self) -> MenuHandle
    {
        MenuHandle(self.h_menu_disasm)
    }

    /// Dump view context menu.
    #[must_use]
    pub fn dump_menu(&self) -> MenuHandle
    {
        MenuHandle(self.h_menu_dump)
    }

    /// Stack view context menu.
    #[must_use]
    pub fn stack_menu(&self) -> MenuHandle
    {
        MenuHandle(self.h_menu_stack)
    }
}
