//! Attribute values and their declared types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Category, ObjectId, ValueError};

/// A dynamically typed attribute value.
///
/// Object-valued attributes are held as [`AttrValue::Id`], never as a live
/// reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Id(ObjectId),
	List(Vec<AttrValue>),
	Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Float(v) => Some(*v),
			Self::Int(v) => Some(*v as f64),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_id(&self) -> Option<ObjectId> {
		match self {
			Self::Id(id) => Some(*id),
			Self::String(s) => s.parse().ok(),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
		match self {
			Self::Map(m) => Some(m),
			_ => None,
		}
	}

	/// Flattens a map of scalars into strings, as used by `context` maps.
	pub fn to_string_map(&self) -> BTreeMap<String, String> {
		self.as_map()
			.map(|m| m.iter().map(|(k, v)| (k.clone(), v.to_string())).collect())
			.unwrap_or_default()
	}
}

impl fmt::Display for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bool(v) => write!(f, "{v}"),
			Self::Int(v) => write!(f, "{v}"),
			Self::Float(v) => write!(f, "{v}"),
			Self::String(s) => f.write_str(s),
			Self::Id(id) => write!(f, "{id}"),
			Self::List(_) | Self::Map(_) => match serde_json::to_string(self) {
				Ok(json) => f.write_str(&json),
				Err(_) => Err(fmt::Error),
			},
		}
	}
}

impl From<bool> for AttrValue {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

impl From<i64> for AttrValue {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<i32> for AttrValue {
	fn from(v: i32) -> Self {
		Self::Int(v.into())
	}
}

impl From<f64> for AttrValue {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

impl From<&str> for AttrValue {
	fn from(v: &str) -> Self {
		Self::String(v.to_string())
	}
}

impl From<String> for AttrValue {
	fn from(v: String) -> Self {
		Self::String(v)
	}
}

impl From<ObjectId> for AttrValue {
	fn from(v: ObjectId) -> Self {
		Self::Id(v)
	}
}

impl<V: Into<AttrValue>> From<BTreeMap<String, V>> for AttrValue {
	fn from(v: BTreeMap<String, V>) -> Self {
		Self::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
	}
}

/// What a conversion may consult besides the raw value.
pub trait ConvertContext {
	/// Expands `${name}` placeholders in a string input.
	fn interpolate(&self, template: &str) -> Result<String, ValueError>;

	/// Looks up a live object of `category` by name.
	fn resolve_reference(&self, category: Category, name: &str) -> Option<ObjectId>;
}

/// Conversion context with no variables and no objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainContext;

impl ConvertContext for PlainContext {
	fn interpolate(&self, template: &str) -> Result<String, ValueError> {
		Ok(template.to_string())
	}

	fn resolve_reference(&self, _category: Category, _name: &str) -> Option<ObjectId> {
		None
	}
}

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
	Bool,
	Int,
	Float,
	String,
	Id,
	/// Id of a live object of the category, convertible from its name.
	Reference(Category),
	List,
	Map,
	/// One of a fixed set of names.
	Enum(&'static [&'static str]),
}

impl ValueType {
	/// Human-readable type name used in descriptions and errors.
	pub fn name(&self) -> String {
		match self {
			Self::Bool => "Boolean".to_string(),
			Self::Int => "Integer".to_string(),
			Self::Float => "Number".to_string(),
			Self::String => "String".to_string(),
			Self::Id => "Id".to_string(),
			Self::Reference(category) => category.to_string(),
			Self::List => "List".to_string(),
			Self::Map => "Map".to_string(),
			Self::Enum(names) => format!("Enum[{}]", names.join(",")),
		}
	}

	/// Value shown in place of a secure attribute to unprivileged callers.
	pub fn masked(&self, placeholder: &str) -> Option<AttrValue> {
		match self {
			Self::String => Some(AttrValue::String(placeholder.to_string())),
			Self::Int => Some(AttrValue::Int(0)),
			Self::Float => Some(AttrValue::Float(0.0)),
			_ => None,
		}
	}

	/// Converts `value` to this type.
	///
	/// String inputs are interpolated through `ctx` first; list and map types
	/// accept JSON text.
	pub fn convert(&self, value: &AttrValue, ctx: &dyn ConvertContext) -> Result<AttrValue, ValueError> {
		let value = match value {
			AttrValue::String(s) => AttrValue::String(ctx.interpolate(s)?),
			other => other.clone(),
		};
		let invalid = |value: &AttrValue| ValueError::Invalid {
			expected: self.name(),
			input: value.to_string(),
		};

		match (self, &value) {
			(Self::Bool, AttrValue::Bool(_)) => Ok(value),
			(Self::Bool, AttrValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
				"true" => Ok(AttrValue::Bool(true)),
				"false" => Ok(AttrValue::Bool(false)),
				_ => Err(invalid(&value)),
			},
			(Self::Int, AttrValue::Int(_)) => Ok(value),
			(Self::Int, AttrValue::Float(f)) if f.fract() == 0.0 && f.is_finite() => Ok(AttrValue::Int(*f as i64)),
			(Self::Int, AttrValue::String(s)) => s.trim().parse().map(AttrValue::Int).map_err(|_| invalid(&value)),
			(Self::Float, AttrValue::Float(_)) => Ok(value),
			(Self::Float, AttrValue::Int(i)) => Ok(AttrValue::Float(*i as f64)),
			(Self::Float, AttrValue::String(s)) => s.trim().parse().map(AttrValue::Float).map_err(|_| invalid(&value)),
			(Self::String, AttrValue::String(_)) => Ok(value),
			(Self::String, AttrValue::Bool(_) | AttrValue::Int(_) | AttrValue::Float(_) | AttrValue::Id(_)) => {
				Ok(AttrValue::String(value.to_string()))
			}
			(Self::Id, AttrValue::Id(_)) => Ok(value),
			(Self::Id, AttrValue::String(s)) => s.parse().map(AttrValue::Id).map_err(|_| invalid(&value)),
			(Self::Reference(_), AttrValue::Id(_)) => Ok(value),
			(Self::Reference(category), AttrValue::String(s)) => {
				if let Ok(id) = s.parse() {
					return Ok(AttrValue::Id(id));
				}
				ctx.resolve_reference(*category, s)
					.map(AttrValue::Id)
					.ok_or_else(|| ValueError::UnknownReference {
						category: *category,
						name: s.clone(),
					})
			}
			(Self::List, AttrValue::List(_)) => Ok(value),
			(Self::List, AttrValue::String(s)) => match serde_json::from_str::<AttrValue>(s) {
				Ok(list @ AttrValue::List(_)) => Ok(list),
				_ => Err(invalid(&value)),
			},
			(Self::Map, AttrValue::Map(_)) => Ok(value),
			(Self::Map, AttrValue::String(s)) => match serde_json::from_str::<AttrValue>(s) {
				Ok(map @ AttrValue::Map(_)) => Ok(map),
				_ => Err(invalid(&value)),
			},
			(Self::Enum(allowed), AttrValue::String(s)) => allowed
				.iter()
				.find(|name| name.eq_ignore_ascii_case(s.trim()))
				.map(|name| AttrValue::String((*name).to_string()))
				.ok_or_else(|| ValueError::NotInEnum {
					input: s.clone(),
					allowed: *allowed,
				}),
			_ => Err(invalid(&value)),
		}
	}
}

impl fmt::Display for ValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name())
	}
}
