/// Sets a panic hook to provide better error messages and encourage users to report bugs.
pub fn set() {
    std::panic::set_hook(Box::new(|info| {
        let msg = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            info.to_string()
        };

        if let Some(loc) = info.location() {
            tracing::error!(file = loc.file(), line = loc.line(), "panic: {msg}");
            eprintln!("Panic: {msg:?} at {}:{}", loc.file(), loc.line());
        } else {
            tracing::error!("panic: {msg}");
            eprintln!("Panic: {msg:?}");
        }

        eprintln!("This is a bug! Please report it with the command you ran and RUST_LOG=debug output.");
    }));
}
