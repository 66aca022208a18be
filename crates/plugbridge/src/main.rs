use std::mem::offset_of;
use std::process;

use clap::{Parser, Subcommand};
use plugbridge_core::events::layout::{
    debug_event_layouts, LayoutInfo, RawCreateProcessDebugInfo, RawDebugEvent, RawExceptionDebugInfo,
    RawExceptionRecord, RawLoadDllDebugInfo, RawOutputDebugStringInfo,
};
use plugbridge_core::events::DebugEventCode;
use plugbridge_core::payload::{callback_payload_layouts, is_decoded, PlugCbTraceExecute};
use plugbridge_core::types::PlugInitStruct;
use plugbridge_core::{CallbackType, TRAMPOLINE_SLOTS};
use plugbridge_utils::{debug, init_logging, init_logging_with_level, LogFormat, LogLevel};

/// Inspect the native ABI tables compiled into the plugbridge debugger-plugin bridge.
#[derive(Parser, Debug)]
#[command(name = "plugbridge")]
#[command(version)]
#[command(about = "Inspect the native ABI tables compiled into the plugin bridge", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print size, alignment and key field offsets of every mirrored C structure
    Layout,
    /// List callback type codes (CBTYPE)
    Callbacks,
    /// List debug event codes (dwDebugEventCode)
    Events,
}

fn main()
{
    let cli = Cli::parse();

    // Defaults to INFO level and Pretty format unless RUST_LOG / PLUGBRIDGE_LOG_FORMAT say otherwise
    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty),
        None => init_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    match cli.command {
        Commands::Layout => print_layouts(),
        Commands::Callbacks => print_callbacks(),
        Commands::Events => print_events(),
    }
}

fn print_layouts()
{
    debug!(pointer_width = usize::BITS, "printing structure layouts");
    println!("Target pointer width: {} bits", usize::BITS);
    println!();

    print_layout_table("Debug event structures", &debug_event_layouts());
    println!();
    print_layout_table("Plugin structures", &callback_payload_layouts());
    println!();

    let offsets = [
        ("DEBUG_EVENT.u", offset_of!(RawDebugEvent, u)),
        ("EXCEPTION_RECORD.ExceptionRecord", offset_of!(RawExceptionRecord, exception_record)),
        ("EXCEPTION_RECORD.ExceptionAddress", offset_of!(RawExceptionRecord, exception_address)),
        ("EXCEPTION_RECORD.NumberParameters", offset_of!(RawExceptionRecord, number_parameters)),
        (
            "EXCEPTION_RECORD.ExceptionInformation",
            offset_of!(RawExceptionRecord, exception_information),
        ),
        ("EXCEPTION_DEBUG_INFO.dwFirstChance", offset_of!(RawExceptionDebugInfo, first_chance)),
        ("CREATE_PROCESS_DEBUG_INFO.lpImageName", offset_of!(RawCreateProcessDebugInfo, image_name)),
        ("CREATE_PROCESS_DEBUG_INFO.fUnicode", offset_of!(RawCreateProcessDebugInfo, unicode)),
        ("LOAD_DLL_DEBUG_INFO.lpImageName", offset_of!(RawLoadDllDebugInfo, image_name)),
        ("LOAD_DLL_DEBUG_INFO.fUnicode", offset_of!(RawLoadDllDebugInfo, unicode)),
        (
            "OUTPUT_DEBUG_STRING_INFO.nDebugStringLength",
            offset_of!(RawOutputDebugStringInfo, debug_string_length),
        ),
        ("PLUG_INITSTRUCT.pluginName", offset_of!(PlugInitStruct, plugin_name)),
        ("PLUG_CB_TRACEEXECUTE.stop", offset_of!(PlugCbTraceExecute, stop)),
    ];

    println!("Field offsets:");
    for (field, offset) in offsets {
        println!("  {field:<45} {offset:>4}");
    }
}

fn print_layout_table(title: &str, layouts: &[LayoutInfo])
{
    println!("{title}:");
    println!("  {:<28} {:>6} {:>6}", "STRUCT", "SIZE", "ALIGN");
    for layout in layouts {
        println!("  {:<28} {:>6} {:>6}", layout.name, layout.size, layout.align);
    }
}

fn print_callbacks()
{
    println!("Callback types (CB_LAST = {}):", CallbackType::COUNT);
    for kind in CallbackType::ALL {
        let decoded = if is_decoded(kind) { "decoded" } else { "raw" };
        println!("  {:>2}  {:<22} {decoded}", kind.raw(), kind.c_name());
    }
    println!();
    println!("Trampolines per name-keyed registry: {TRAMPOLINE_SLOTS}");
}

fn print_events()
{
    println!("Debug event codes:");
    for code in DebugEventCode::ALL {
        println!("  {:>2}  {}", code.raw(), code.c_name());
    }
}
