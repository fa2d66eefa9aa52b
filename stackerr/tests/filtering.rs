//! Stack filtering as seen from a downstream crate.
//!
//! This test binary is its own crate, `filtering`, so its frames carry that
//! package while the library's frames carry `stackerr`.

use parking_lot::Mutex;
use std::hint::black_box;
use stackerr::{derive_package, settings, stackerr, ResultExt, Settings, Stack, StackError};

static GLOBAL: Mutex<()> = parking_lot::const_mutex(());

struct Reset;

impl Drop for Reset {
    fn drop(&mut self) {
        settings::reset();
    }
}

/// Holds the global lock; settings are reset before the lock is released
fn configure(f: impl Fn(Settings) -> Settings) -> (Reset, parking_lot::MutexGuard<'static, ()>) {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
    let guard = GLOBAL.lock();
    settings::install(f(Settings::default()));
    (Reset, guard)
}

#[inline(never)]
fn service_call() -> StackError {
    black_box(StackError::new("service unavailable"))
}

#[inline(never)]
fn handler() -> StackError {
    black_box(StackError::wrap_error(service_call(), "handling request"))
}

#[inline(never)]
fn capture_inner(settings: &Settings) -> Stack {
    black_box(Stack::capture_with(settings))
}

#[inline(never)]
fn capture_outer(settings: &Settings) -> Stack {
    black_box(capture_inner(settings))
}

#[inline(never)]
fn capture_global_inner() -> Stack {
    black_box(Stack::capture())
}

#[test]
fn short_package_name_keeps_caller_frames_only() {
    let _cfg = configure(|s| s.with_package_name("filtering"));

    let err = service_call();
    let stack = err.stack();
    assert!(stack.len() >= 2, "{:?}", stack);
    assert!(stack[0].function().ends_with("service_call"), "{:?}", stack);
    assert!(stack[1]
        .function()
        .contains("short_package_name_keeps_caller_frames_only"));
    for frame in stack {
        assert_eq!(derive_package(frame.function()).1, "filtering");
    }
}

#[test]
fn library_frames_never_appear() {
    let _cfg = configure(|s| s);

    let err = stackerr!("fooey");
    assert!(err.stack().len() <= settings::DEFAULT_MAX_STACK_DEPTH);
    assert!(err.stack()[0].function().contains("library_frames_never_appear"));
    assert!(err.stack().iter().all(|f| {
        !f.function().starts_with("stackerr::") && !f.function().starts_with("backtrace::")
    }));
}

#[test]
fn capture_starts_at_direct_caller() {
    let settings = Settings::new().with_package_name("filtering");

    let stack = capture_outer(&settings);
    let names: Vec<&str> = stack.iter().map(|f| f.function()).collect();
    assert!(names.len() >= 3, "{:?}", names);
    assert_eq!(names[0], "filtering::capture_inner");
    assert_eq!(names[1], "filtering::capture_outer");
    assert!(names[2].contains("capture_starts_at_direct_caller"), "{:?}", names);
}

#[test]
fn global_capture_starts_at_direct_caller() {
    let _cfg = configure(|s| s.with_package_name("filtering"));

    let stack = capture_global_inner();
    assert_eq!(stack[0].function(), "filtering::capture_global_inner", "{:?}", stack);
    assert!(stack[1]
        .function()
        .contains("global_capture_starts_at_direct_caller"));
}

#[test]
fn macro_reports_call_site_line() {
    let _cfg = configure(|s| s.with_package_name("filtering"));

    let (err, line) = (stackerr!("fooey {}", 2), line!());
    assert_eq!(err.message(), "fooey 2");
    assert!(err.stack()[0].function().contains("macro_reports_call_site_line"));
    assert_eq!(err.stack()[0].line(), line);
}

#[test]
fn exact_package_filter() {
    let _cfg = configure(|s| s.with_exact_package("filtering"));

    let err = handler();
    let outer = err.stack();
    assert!(outer[0].function().ends_with("handler"), "{:?}", outer);

    let inner = err.cause().unwrap().downcast_ref::<StackError>().unwrap();
    assert!(inner.stack()[0].function().ends_with("service_call"));
    assert!(inner.stack()[1].function().ends_with("handler"));
}

#[test]
fn predicate_and_name_are_conjunctive() {
    let _cfg = configure(|s| {
        s.with_package_filter(|package: &str| package == "filtering")
            .with_package_name("stackerr")
    });

    assert!(service_call().stack().is_empty());
}

#[test]
fn predicate_sees_full_package() {
    let seen = std::sync::Arc::new(Mutex::new(Vec::<String>::new()));
    let record = seen.clone();
    let settings = Settings::new().with_package_filter(move |package: &str| {
        record.lock().push(package.to_string());
        package == "filtering"
    });

    let stack = Stack::capture_with(&settings);
    assert!(!stack.is_empty());
    assert!(seen.lock().iter().any(|p| p == "filtering"));
    assert!(seen.lock().iter().any(|p| p != "filtering"));
}

#[test]
fn max_depth_bounds_retained_frames() {
    let _cfg = configure(|s| s.with_max_stack_depth(1).with_package_name("filtering"));

    let err = handler();
    assert_eq!(err.stack().len(), 1);
    assert!(err.stack()[0].function().ends_with("handler"));
}

#[test]
fn zero_depth_gives_empty_stack() {
    let _cfg = configure(|s| s.with_max_stack_depth(0));

    let err = StackError::new("fooey");
    assert!(err.stack().is_empty());
    assert_eq!(format!("{:#}", err), "fooey");
}

#[test]
fn verbose_output_ends_with_caller_line() {
    let _cfg = configure(|s| s.with_package_name("filtering"));

    let (err, line) = (StackError::new("fooey").with_cause("cause"), line!());
    let out = format!("{:#}", err);
    let lines: Vec<&str> = out.split('\n').collect();

    assert_eq!(lines[0], "fooey: cause");
    assert_eq!(lines[1], "Stack:");
    assert!(lines[2].starts_with("\tfiltering::verbose_output_ends_with_caller_line"));
    assert!(lines[2].ends_with(&format!(":{}", line)), "{}", lines[2]);
}

#[test]
fn verbose_output_without_formatter() {
    let _cfg = configure(|s| s.with_package_name("filtering").without_frame_formatter());

    let err = StackError::new("fooey").with_cause("cause");
    assert!(!err.stack().is_empty());
    assert_eq!(format!("{:#}", err), "fooey: cause");
}

#[test]
fn wrap_err_from_downstream() {
    let _cfg = configure(|s| s.with_package_name("filtering"));

    let parsed: Result<u8, _> = "300".parse::<u8>();
    let (result, line) = (parsed.wrap_err("parsing retries"), line!());
    let err = result.unwrap_err();
    assert_eq!(err.stack()[0].line(), line);
    assert!(err.to_string().starts_with("parsing retries: "));
}

#[test]
fn stack_frames_serialize() {
    let _cfg = configure(|s| s.with_package_name("filtering"));

    let err = service_call();
    let json = serde_json::to_value(err.stack()).unwrap();
    let first = &json[0];
    assert!(first["function"].as_str().unwrap().ends_with("service_call"));
    assert!(first["file"].as_str().unwrap().ends_with("filtering.rs"));
    assert!(first["line"].as_u64().unwrap() > 0);
}
