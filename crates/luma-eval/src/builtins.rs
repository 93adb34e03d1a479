//! Sketch builtins: pin I/O, timing, randomness, printing and `Math`.

use crate::cancel::suspend;
use crate::error::{EvalError, EvalResult};
use crate::host::{DeviceError, HostContext, LogLevel, PinMode};
use crate::value::{Namespace, Value};

pub const HIGH: f64 = 1.0;
pub const LOW: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    PinMode,
    DigitalWrite,
    AnalogWrite,
    DigitalRead,
    AnalogRead,
    Toggle,
    SetAll,
    ShiftLeft,
    ShiftRight,
    Delay,
    Millis,
    Random,
    Print,
    MathFloor,
    MathCeil,
    MathRound,
    MathAbs,
    MathMin,
    MathMax,
    MathSqrt,
    MathPow,
    MathSin,
    MathCos,
}

/// Globally visible builtins, in install order.
pub(crate) const GLOBAL_BUILTINS: &[Builtin] = &[
    Builtin::PinMode,
    Builtin::DigitalWrite,
    Builtin::AnalogWrite,
    Builtin::DigitalRead,
    Builtin::AnalogRead,
    Builtin::Toggle,
    Builtin::SetAll,
    Builtin::ShiftLeft,
    Builtin::ShiftRight,
    Builtin::Delay,
    Builtin::Millis,
    Builtin::Random,
    Builtin::Print,
];

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::PinMode => "pinMode",
            Builtin::DigitalWrite => "digitalWrite",
            Builtin::AnalogWrite => "analogWrite",
            Builtin::DigitalRead => "digitalRead",
            Builtin::AnalogRead => "analogRead",
            Builtin::Toggle => "toggle",
            Builtin::SetAll => "setAll",
            Builtin::ShiftLeft => "shiftLeft",
            Builtin::ShiftRight => "shiftRight",
            Builtin::Delay => "delay",
            Builtin::Millis => "millis",
            Builtin::Random => "random",
            Builtin::Print => "print",
            Builtin::MathFloor => "floor",
            Builtin::MathCeil => "ceil",
            Builtin::MathRound => "round",
            Builtin::MathAbs => "abs",
            Builtin::MathMin => "min",
            Builtin::MathMax => "max",
            Builtin::MathSqrt => "sqrt",
            Builtin::MathPow => "pow",
            Builtin::MathSin => "sin",
            Builtin::MathCos => "cos",
        }
    }

    /// Whether the call touches the device or console and so must hold a
    /// live token.
    fn has_side_effects(self) -> bool {
        !matches!(
            self,
            Builtin::MathFloor
                | Builtin::MathCeil
                | Builtin::MathRound
                | Builtin::MathAbs
                | Builtin::MathMin
                | Builtin::MathMax
                | Builtin::MathSqrt
                | Builtin::MathPow
                | Builtin::MathSin
                | Builtin::MathCos
        )
    }
}

/// Constants installed next to the builtins.
pub(crate) fn global_constants() -> Vec<(&'static str, Value)> {
    vec![
        ("HIGH", Value::Number(HIGH)),
        ("LOW", Value::Number(LOW)),
        (PinMode::OUTPUT, Value::str(PinMode::OUTPUT)),
        (PinMode::INPUT, Value::str(PinMode::INPUT)),
        ("Math", Value::Namespace(Namespace::Math)),
        ("NaN", Value::Number(f64::NAN)),
        ("Infinity", Value::Number(f64::INFINITY)),
    ]
}

/// Property lookup on a namespace object.
pub(crate) fn namespace_member(ns: Namespace, property: &str) -> Value {
    let Namespace::Math = ns;
    let builtin = match property {
        "PI" => return Value::Number(std::f64::consts::PI),
        "floor" => Builtin::MathFloor,
        "ceil" => Builtin::MathCeil,
        "round" => Builtin::MathRound,
        "abs" => Builtin::MathAbs,
        "min" => Builtin::MathMin,
        "max" => Builtin::MathMax,
        "sqrt" => Builtin::MathSqrt,
        "pow" => Builtin::MathPow,
        "sin" => Builtin::MathSin,
        "cos" => Builtin::MathCos,
        _ => return Value::Undefined,
    };
    Value::Builtin(builtin)
}

fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&Value::Undefined)
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    arg(args, i).to_number()
}

/// `Number(v) || 0`
fn num_or_zero(v: &Value) -> f64 {
    let n = v.to_number();
    if n.is_nan() {
        0.0
    } else {
        n
    }
}

fn clamp_level(n: f64) -> u8 {
    n.clamp(0.0, 255.0).round() as u8
}

/// Validate a pin index against the device.
fn pin_arg(host: &HostContext, v: &Value) -> Result<usize, DeviceError> {
    let count = host.device.pin_count();
    let n = v.to_number();
    if n.is_finite() && n.fract() == 0.0 && n >= 0.0 && n < count as f64 {
        Ok(n as usize)
    } else {
        Err(DeviceError::pin_range(v, count))
    }
}

/// Invoke a builtin. `awaited` is true when the call is the direct operand
/// of `await`.
pub(crate) async fn call(
    host: &HostContext,
    builtin: Builtin,
    args: Vec<Value>,
    awaited: bool,
) -> EvalResult<Value> {
    if builtin.has_side_effects() {
        host.token.ensure_live()?;
    }
    let device = &host.device;

    let value = match builtin {
        Builtin::PinMode => {
            let pin = pin_arg(host, arg(&args, 0))?;
            let mode_arg = arg(&args, 1);
            let mode = match mode_arg {
                Value::Str(s) => PinMode::parse(s),
                _ => None,
            }
            .ok_or_else(|| {
                EvalError::Builtin(format!(
                    "pinMode(pin, mode) expects OUTPUT or INPUT, got {mode_arg}."
                ))
            })?;
            device.configure_pin(pin, mode)?;
            Value::Undefined
        }
        Builtin::DigitalWrite => {
            let pin = pin_arg(host, arg(&args, 0))?;
            let high = match arg(&args, 1) {
                Value::Number(n) => *n == HIGH,
                Value::Bool(b) => *b,
                _ => false,
            };
            device.write_digital(pin, high)?;
            Value::Undefined
        }
        Builtin::AnalogWrite => {
            let pin = pin_arg(host, arg(&args, 0))?;
            device.write_pwm(pin, clamp_level(num_or_zero(arg(&args, 1))))?;
            Value::Undefined
        }
        Builtin::DigitalRead => {
            let pin = pin_arg(host, arg(&args, 0))?;
            let level = device.read_state(pin)?;
            Value::Number(if level > 0 { HIGH } else { LOW })
        }
        Builtin::AnalogRead => {
            let pin = pin_arg(host, arg(&args, 0))?;
            Value::Number(f64::from(device.read_state(pin)?))
        }
        Builtin::Toggle => {
            let pin = pin_arg(host, arg(&args, 0))?;
            device.toggle(pin)?;
            Value::Undefined
        }
        Builtin::SetAll => {
            let level = match arg(&args, 0) {
                Value::Number(n) if *n == HIGH => 255,
                Value::Number(n) if *n == LOW => 0,
                other => clamp_level(num_or_zero(other)),
            };
            device.set_all(level);
            Value::Undefined
        }
        Builtin::ShiftLeft => {
            device.shift_left();
            Value::Undefined
        }
        Builtin::ShiftRight => {
            device.shift_right();
            Value::Undefined
        }
        Builtin::Delay => {
            if !awaited {
                return Err(EvalError::AwaitRequired);
            }
            suspend(&host.token, num_or_zero(arg(&args, 0)).max(0.0), host.suspend).await?;
            Value::Undefined
        }
        Builtin::Millis => Value::Number(device.elapsed_millis() as f64),
        Builtin::Random => random(host, &args)?,
        Builtin::Print => {
            let line = args
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            host.console.write_line(&line, LogLevel::Info);
            Value::Undefined
        }
        Builtin::MathFloor => Value::Number(num_arg(&args, 0).floor()),
        Builtin::MathCeil => Value::Number(num_arg(&args, 0).ceil()),
        Builtin::MathRound => Value::Number((num_arg(&args, 0) + 0.5).floor()),
        Builtin::MathAbs => Value::Number(num_arg(&args, 0).abs()),
        Builtin::MathMin => Value::Number(fold(&args, f64::INFINITY, f64::min)),
        Builtin::MathMax => Value::Number(fold(&args, f64::NEG_INFINITY, f64::max)),
        Builtin::MathSqrt => Value::Number(num_arg(&args, 0).sqrt()),
        Builtin::MathPow => Value::Number(num_arg(&args, 0).powf(num_arg(&args, 1))),
        Builtin::MathSin => Value::Number(num_arg(&args, 0).sin()),
        Builtin::MathCos => Value::Number(num_arg(&args, 0).cos()),
    };
    Ok(value)
}

/// `Math.min`/`Math.max`: any NaN argument makes the result NaN.
fn fold(args: &[Value], init: f64, f: fn(f64, f64) -> f64) -> f64 {
    args.iter().try_fold(init, |acc, v| {
        let n = v.to_number();
        if n.is_nan() {
            None
        } else {
            Some(f(acc, n))
        }
    })
    .unwrap_or(f64::NAN)
}

fn random(host: &HostContext, args: &[Value]) -> EvalResult<Value> {
    let (low, high) = if args.len() < 2 {
        let upper = num_arg(args, 0);
        if !(upper.is_finite() && upper > 0.0) {
            return Err(EvalError::Builtin("random(max) requires max > 0.".to_string()));
        }
        (0.0, upper)
    } else {
        let (low, high) = (num_arg(args, 0), num_arg(args, 1));
        if !(low.is_finite() && high.is_finite() && high > low) {
            return Err(EvalError::Builtin(
                "random(min, max) requires finite numbers with max > min.".to_string(),
            ));
        }
        (low, high)
    };
    let (min, max) = (low.floor() as i64, high.ceil() as i64);
    let n = if min < max {
        host.device.random_int(min, max)
    } else {
        min
    };
    Ok(Value::Number(n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_level() {
        assert_eq!(clamp_level(-5.0), 0);
        assert_eq!(clamp_level(127.6), 128);
        assert_eq!(clamp_level(1000.0), 255);
    }

    #[test]
    fn test_math_members() {
        assert!(matches!(
            namespace_member(Namespace::Math, "floor"),
            Value::Builtin(Builtin::MathFloor)
        ));
        assert!(matches!(namespace_member(Namespace::Math, "tan"), Value::Undefined));
        assert_eq!(namespace_member(Namespace::Math, "PI").to_number(), std::f64::consts::PI);
    }

    #[test]
    fn test_min_max_fold() {
        let args = [Value::Number(3.0), Value::str("7"), Value::Number(-1.0)];
        assert_eq!(fold(&args, f64::NEG_INFINITY, f64::max), 7.0);
        assert_eq!(fold(&args, f64::INFINITY, f64::min), -1.0);
        assert_eq!(fold(&[], f64::INFINITY, f64::min), f64::INFINITY);
        assert!(fold(&[Value::Undefined], f64::INFINITY, f64::min).is_nan());
    }

    #[test]
    fn test_global_names_are_unique() {
        let mut names: Vec<_> = GLOBAL_BUILTINS.iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), GLOBAL_BUILTINS.len());
    }
}
