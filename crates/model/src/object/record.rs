use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ConfiguredObject;
use crate::{AttrValue, ObjectId, ValueType};

/// Persistable view of one object.
///
/// Attributes are the stored values. References given by name are replaced
/// by the id they resolve to. The `id` attribute itself is carried only in [`ObjectRecord::id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
	pub id: ObjectId,
	pub category: String,
	#[serde(rename = "type")]
	pub type_tag: String,
	pub attributes: BTreeMap<String, AttrValue>,
	/// Parent id per parent category name.
	pub parents: IndexMap<String, ObjectId>,
}

impl ConfiguredObject {
	pub fn as_record(&self) -> ObjectRecord {
		let mut attributes = self.actual_attributes();
		attributes.remove("id");
		for desc in self.node.type_info.attributes() {
			if !matches!(desc.value_type(), ValueType::Reference(_)) {
				continue;
			}
			if let Some(stored) = attributes.get_mut(desc.name())
				&& let Ok(AttrValue::Id(id)) = self.convert_value(desc, stored)
			{
				*stored = AttrValue::Id(id);
			}
		}
		ObjectRecord {
			id: self.id(),
			category: self.category().name().to_string(),
			type_tag: self.type_tag().to_string(),
			attributes,
			parents: self
				.parent_ids()
				.iter()
				.map(|(category, id)| (category.name().to_string(), *id))
				.collect(),
		}
	}

	/// Records of this object's parents, keyed by parent category name.
	pub fn parent_records(&self) -> IndexMap<String, ObjectRecord> {
		self.parents()
			.into_iter()
			.map(|parent| (parent.category().name().to_string(), parent.as_record()))
			.collect()
	}
}
