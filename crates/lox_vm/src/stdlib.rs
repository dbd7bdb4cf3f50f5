use std::time::{SystemTime, UNIX_EPOCH};

use crate::value::Value;
use crate::vm::Vm;

/// Registers the native functions the language exposes at the top level.
/// `clock` is the only one the runtime defines; scripts see it as an
/// ordinary global, same as anything `var`-declared at the top level.
pub fn register_natives(vm: &mut Vm) {
    vm.define_native("clock", clock);
}

/// Seconds since the Unix epoch, matching clox's `clockNative` (which
/// returns `clock() / CLOCKS_PER_SEC` — wall-clock seconds either way).
fn clock(_args: &[Value]) -> Result<Value, String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| e.to_string())?;
    Ok(Value::Number(now.as_secs_f64()))
}
