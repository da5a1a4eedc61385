//! Keyed variable stores for actors and maps.
//!
//! Each actor owns a [`VariableStore`]; the map owns another one. Reads done
//! by nodes go through [`ScopedLookup`], which checks the actor's reserved
//! kinematic names first, then the actor store, then the map store.

use rustc_hash::FxHashMap;

use super::error::VariableError;
use super::value::{Value, VariableLookup};
use crate::components::actor::ActorInstance;

/// Reserved actor variable for horizontal velocity.
pub const XSPEED: &str = "__XSPEED";
/// Reserved actor variable for vertical velocity.
pub const YSPEED: &str = "__YSPEED";
pub const XPOS: &str = "__XPOS";
pub const YPOS: &str = "__YPOS";
pub const ROTATION: &str = "__ROTATION";

/// Name to value mapping for one scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: FxHashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&Value, VariableError> {
        self.values
            .get(name)
            .ok_or_else(|| VariableError::VariableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Store `value`. With `accumulate`, numbers add and strings concatenate;
    /// a missing variable starts from `value` itself.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: Value,
        accumulate: bool,
    ) -> Result<(), VariableError> {
        let name = name.into();
        let next = match (accumulate, self.values.get(&name)) {
            (true, Some(current)) => add(&name, current, &value)?,
            _ => value,
        };
        self.values.insert(name, next);
        Ok(())
    }

    /// Multiply the stored number by `value`. A missing variable takes `value`.
    pub fn multiply(&mut self, name: impl Into<String>, value: Value) -> Result<(), VariableError> {
        let name = name.into();
        let next = match self.values.get(&name) {
            Some(current) => mul(&name, current, &value)?,
            None => value,
        };
        self.values.insert(name, next);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl VariableLookup for VariableStore {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// `current + operand` with int to float promotion and string concatenation.
pub fn add(name: &str, current: &Value, operand: &Value) -> Result<Value, VariableError> {
    match (current, operand) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(Value::Float(as_f32(current) + as_f32(operand)))
        }
        (Value::Str(a), other) => Ok(Value::Str(format!("{a}{other}"))),
        _ => Err(invalid(name, current, operand)),
    }
}

/// `current * operand` with int to float promotion.
pub fn mul(name: &str, current: &Value, operand: &Value) -> Result<Value, VariableError> {
    match (current, operand) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(Value::Float(as_f32(current) * as_f32(operand)))
        }
        _ => Err(invalid(name, current, operand)),
    }
}

fn as_f32(value: &Value) -> f32 {
    value.as_f32().unwrap_or_default()
}

fn invalid(name: &str, current: &Value, operand: &Value) -> VariableError {
    VariableError::InvalidOperation {
        name: name.to_string(),
        current: current.type_name(),
        operand: operand.type_name(),
    }
}

/// Read view over one actor and the map, used while evaluating that actor.
pub struct ScopedLookup<'a> {
    pub actor: &'a ActorInstance,
    pub map: &'a VariableStore,
}

impl VariableLookup for ScopedLookup<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        read_reserved(self.actor, name)
            .or_else(|| self.actor.variables.lookup(name))
            .or_else(|| self.map.lookup(name))
    }
}

fn read_reserved(actor: &ActorInstance, name: &str) -> Option<Value> {
    let v = match name {
        XSPEED => actor.velocity.x,
        YSPEED => actor.velocity.y,
        XPOS => actor.position.x,
        YPOS => actor.position.y,
        ROTATION => actor.rotation,
        _ => return None,
    };
    Some(Value::Float(v))
}

fn reserved_slot<'a>(actor: &'a mut ActorInstance, name: &str) -> Option<&'a mut f32> {
    match name {
        XSPEED => Some(&mut actor.velocity.x),
        YSPEED => Some(&mut actor.velocity.y),
        XPOS => Some(&mut actor.position.x),
        YPOS => Some(&mut actor.position.y),
        ROTATION => Some(&mut actor.rotation),
        _ => None,
    }
}

/// Write into the actor scope, mapping reserved names onto kinematic fields.
pub fn write_actor(
    actor: &mut ActorInstance,
    name: &str,
    value: Value,
    accumulate: bool,
) -> Result<(), VariableError> {
    match reserved_slot(actor, name) {
        Some(slot) => {
            let operand = value.as_f32().ok_or_else(|| VariableError::TypeMismatch {
                name: name.to_string(),
                expected: "float",
                found: value.type_name(),
            })?;
            *slot = if accumulate { *slot + operand } else { operand };
            Ok(())
        }
        None => actor.variables.set(name, value, accumulate),
    }
}

/// Multiply in the actor scope, mapping reserved names onto kinematic fields.
pub fn multiply_actor(
    actor: &mut ActorInstance,
    name: &str,
    value: Value,
) -> Result<(), VariableError> {
    match reserved_slot(actor, name) {
        Some(slot) => {
            let operand = value.as_f32().ok_or_else(|| VariableError::TypeMismatch {
                name: name.to_string(),
                expected: "float",
                found: value.type_name(),
            })?;
            *slot *= operand;
            Ok(())
        }
        None => actor.variables.multiply(name, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::actor::{ActorId, ActorInstance};
    use glam::Vec2;

    #[test]
    fn test_get_missing_is_error() {
        let store = VariableStore::new();
        assert_eq!(
            store.get("Coins"),
            Err(VariableError::VariableNotFound("Coins".into()))
        );
    }

    #[test]
    fn test_accumulate_five_times_from_zero() {
        let mut store = VariableStore::new();
        store.set("Count", Value::Int(0), false).unwrap();
        for _ in 0..5 {
            store.set("Count", Value::Int(1), true).unwrap();
        }
        assert_eq!(store.get("Count").unwrap(), &Value::Int(5));
    }

    #[test]
    fn test_accumulate_missing_starts_from_value() {
        let mut store = VariableStore::new();
        store.set("Score", Value::Int(3), true).unwrap();
        assert_eq!(store.get("Score").unwrap(), &Value::Int(3));
    }

    #[test]
    fn test_accumulate_promotes_to_float() {
        let mut store = VariableStore::new();
        store.set("Speed", Value::Int(2), false).unwrap();
        store.set("Speed", Value::Float(0.5), true).unwrap();
        assert_eq!(store.get("Speed").unwrap(), &Value::Float(2.5));
    }

    #[test]
    fn test_accumulate_concatenates_strings() {
        let mut store = VariableStore::new();
        store.set("Log", Value::Str("Coins: ".into()), false).unwrap();
        store.set("Log", Value::Int(4), true).unwrap();
        assert_eq!(store.get("Log").unwrap(), &Value::Str("Coins: 4".into()));
    }

    #[test]
    fn test_accumulate_bool_is_invalid() {
        let mut store = VariableStore::new();
        store.set("Flag", Value::Bool(true), false).unwrap();
        let err = store.set("Flag", Value::Int(1), true).unwrap_err();
        assert!(matches!(err, VariableError::InvalidOperation { .. }));
        assert_eq!(store.get("Flag").unwrap(), &Value::Bool(true));
    }

    #[test]
    fn test_multiply() {
        let mut store = VariableStore::new();
        store.set("Gold", Value::Int(3), false).unwrap();
        store.multiply("Gold", Value::Int(4)).unwrap();
        assert_eq!(store.get("Gold").unwrap(), &Value::Int(12));
        store.multiply("Gold", Value::Float(0.5)).unwrap();
        assert_eq!(store.get("Gold").unwrap(), &Value::Float(6.0));
    }

    #[test]
    fn test_scoped_lookup_prefers_actor_then_map() {
        let mut actor = ActorInstance::new(ActorId(1), "Hero", Vec2::ZERO);
        actor.variables.set("Lives", Value::Int(3), false).unwrap();
        actor.velocity = Vec2::new(4.0, -2.0);
        let mut map = VariableStore::new();
        map.set("Lives", Value::Int(9), false).unwrap();
        map.set("Level", Value::Str("1-1".into()), false).unwrap();

        let lookup = ScopedLookup { actor: &actor, map: &map };
        assert_eq!(lookup.lookup("Lives"), Some(Value::Int(3)));
        assert_eq!(lookup.lookup("Level"), Some(Value::Str("1-1".into())));
        assert_eq!(lookup.lookup(XSPEED), Some(Value::Float(4.0)));
        assert_eq!(lookup.lookup("Missing"), None);
    }

    #[test]
    fn test_write_actor_reserved_names() {
        let mut actor = ActorInstance::new(ActorId(1), "Hero", Vec2::ZERO);
        actor.velocity.y = -120.0;
        write_actor(&mut actor, YSPEED, Value::Int(0), false).unwrap();
        assert_eq!(actor.velocity.y, 0.0);

        write_actor(&mut actor, ROTATION, Value::Float(15.0), true).unwrap();
        write_actor(&mut actor, ROTATION, Value::Float(15.0), true).unwrap();
        assert_eq!(actor.rotation, 30.0);

        multiply_actor(&mut actor, ROTATION, Value::Int(2)).unwrap();
        assert_eq!(actor.rotation, 60.0);

        let err = write_actor(&mut actor, XPOS, Value::Str("left".into()), false).unwrap_err();
        assert!(matches!(err, VariableError::TypeMismatch { .. }));
    }
}
