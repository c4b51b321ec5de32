//! `${name}` template expansion against inherited object context.
//!
//! Lookup order for a variable:
//! 1. the object's inherited context (root ancestor first, descendants override)
//! 2. [`crate::ModelConfig::properties`]
//! 3. process environment variables
//! 4. default-context values declared by registered types
//!
//! A substituted value is expanded one further level, so a context entry
//! `y = "${x}"` yields the value of `x`. Placeholders inside that second
//! level pass through verbatim.

use std::collections::BTreeMap;

use crate::{AttrValue, ConfigError, ConfiguredObject};

const MAX_DEPTH: usize = 1;

/// Expands `template`, leaving unresolved placeholders in place.
pub fn interpolate(template: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
	match expand(template, lookup, false, 0) {
		Ok(expanded) => expanded,
		Err(_) => template.to_string(),
	}
}

/// Expands `template`, failing on the first undefined variable.
pub fn interpolate_strict(template: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
	expand(template, lookup, true, 0)
}

fn expand(
	template: &str,
	lookup: &dyn Fn(&str) -> Option<String>,
	strict: bool,
	depth: usize,
) -> Result<String, ConfigError> {
	let mut out = String::with_capacity(template.len());
	let mut rest = template;
	while let Some(start) = rest.find("${") {
		out.push_str(&rest[..start]);
		let after = &rest[start + 2..];
		let Some(end) = after.find('}') else {
			out.push_str(&rest[start..]);
			return Ok(out);
		};
		let name = &after[..end];
		match lookup(name) {
			Some(value) if depth < MAX_DEPTH => out.push_str(&expand(&value, lookup, strict, depth + 1)?),
			Some(value) => out.push_str(&value),
			None if strict => return Err(ConfigError::UnresolvedVariable(name.to_string())),
			None => out.push_str(&rest[start..start + 2 + end + 1]),
		}
		rest = &after[end + 1..];
	}
	out.push_str(rest);
	Ok(out)
}

impl ConfiguredObject {
	/// Local context maps from the root ancestor down to this object, merged
	/// so that descendants override ancestors.
	///
	/// Ancestry follows the first parent type of each category.
	pub fn inherited_context(&self) -> BTreeMap<String, String> {
		let mut chain = vec![self.clone()];
		loop {
			let Some(parent) = chain.last().and_then(|last| last.parents().into_iter().next()) else {
				break;
			};
			if chain.iter().any(|seen| seen.id() == parent.id()) {
				break;
			}
			chain.push(parent);
		}

		let mut merged = BTreeMap::new();
		for object in chain.iter().rev() {
			if let Some(local) = object.raw_attribute("context") {
				merged.extend(local_context(&local));
			}
		}
		merged
	}

	fn context_lookup(&self) -> impl Fn(&str) -> Option<String> {
		let context = self.inherited_context();
		let model = self.model().clone();
		move |name: &str| {
			context
				.get(name)
				.cloned()
				.or_else(|| model.config().properties.get(name).cloned())
				.or_else(|| std::env::var(name).ok())
				.or_else(|| model.registry().context_default(name).map(str::to_string))
		}
	}

	/// Expands `${name}` placeholders against this object's context.
	pub fn interpolate(&self, template: &str) -> String {
		if !template.contains("${") {
			return template.to_string();
		}
		interpolate(template, &self.context_lookup())
	}

	/// Like [`ConfiguredObject::interpolate`] but fails on undefined variables.
	pub fn interpolate_strict(&self, template: &str) -> Result<String, ConfigError> {
		if !template.contains("${") {
			return Ok(template.to_string());
		}
		interpolate_strict(template, &self.context_lookup())
	}
}

/// Stored context maps may arrive as a map or as JSON text.
fn local_context(value: &AttrValue) -> BTreeMap<String, String> {
	match value {
		AttrValue::String(text) => serde_json::from_str::<AttrValue>(text)
			.map(|parsed| parsed.to_string_map())
			.unwrap_or_default(),
		other => other.to_string_map(),
	}
}
