//! Lifecycle ordering, guards and authorization over a small custom schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use keel_model::meta::{AttributeDef, ContextDefault, SlotDef, TypeDef, TypeRegistry};
use keel_model::{
	AttrValue, CONFIGURED_OBJECT, Category, CategoryGraph, ConfigError, ConfiguredObject, ExecutorError, LifecyclePhase,
	Model, ModelConfig, ModelError, ObjectBehavior, State, Subject, ValidationView, ValueType,
};
use parking_lot::{Mutex, RwLock};

use crate::common::{attrs, init_tracing, named};

const SHELF: Category = Category::new("Shelf");
const BOOK: Category = Category::new("Book");

static ROOT: [&TypeDef; 1] = [&CONFIGURED_OBJECT];

static SHELF_TYPE: TypeDef = TypeDef::category("Shelf", SHELF, &ROOT).default_type("shelf");

static SHELF_SUPERS: [&TypeDef; 1] = [&SHELF_TYPE];

static PLAIN_SHELF: TypeDef = TypeDef::concrete("PlainShelf", "shelf", &SHELF_SUPERS).factory(new_shelf);

const BOOK_ATTRIBUTES: &[AttributeDef] =
	&[AttributeDef::automated("pages", ValueType::Int).default_value("${book.pages}")];

const BOOK_CONTEXT: &[ContextDefault] = &[ContextDefault::new("book.pages", "100")];

const BOOK_SLOTS: &[SlotDef] = &[SlotDef::new("pages", get_pages, set_pages)];

static BOOK_TYPE: TypeDef = TypeDef::category("Book", BOOK, &ROOT)
	.default_type("paperback")
	.attributes(BOOK_ATTRIBUTES)
	.context(BOOK_CONTEXT);

static BOOK_SUPERS: [&TypeDef; 1] = [&BOOK_TYPE];

static PAPERBACK: TypeDef = TypeDef::concrete("Paperback", "paperback", &BOOK_SUPERS)
	.slots(BOOK_SLOTS)
	.factory(new_book);

/// Records the page counts of its books as seen during validation.
#[derive(Default)]
struct Shelf {
	validated_pages: RwLock<Vec<i64>>,
}

impl ObjectBehavior for Shelf {
	fn validate(&self, shelf: &ConfiguredObject) -> Result<(), ModelError> {
		let mut seen = Vec::new();
		for book in shelf.children(BOOK) {
			let pages = book
				.behavior::<Book>()
				.and_then(Book::pages)
				.ok_or_else(|| ConfigError::validation(&book, "not resolved before its shelf"))?;
			seen.push(pages);
		}
		*self.validated_pages.write() = seen;
		Ok(())
	}

	fn add_child(
		&self,
		parent: &ConfiguredObject,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<Option<ConfiguredObject>, ModelError> {
		parent.provision_child(category, attributes, other_parents).map(Some)
	}

	fn authorise_set_attributes(&self, shelf: &ConfiguredObject, _: &ValidationView<'_>) -> Result<(), ModelError> {
		match Subject::current() {
			Some(subject) if subject.name() == "guest" => {
				Err(ModelError::AccessDenied(format!("{} may not change {shelf}", subject.name())))
			}
			_ => Ok(()),
		}
	}

	fn authorise_delete(&self, shelf: &ConfiguredObject) -> Result<(), ModelError> {
		if Subject::current_is_system() {
			return Ok(());
		}
		Err(ModelError::AccessDenied(format!("only the system may delete {shelf}")))
	}
}

#[derive(Default)]
struct Book {
	pages: RwLock<Option<i64>>,
}

impl Book {
	fn pages(&self) -> Option<i64> {
		*self.pages.read()
	}
}

/// Names of books whose delete hook ran.
static DELETED_BOOKS: Mutex<Vec<String>> = Mutex::new(Vec::new());

impl ObjectBehavior for Book {
	fn on_delete(&self, book: &ConfiguredObject) -> Result<(), ModelError> {
		DELETED_BOOKS.lock().push(book.name());
		Ok(())
	}

	fn validate(&self, book: &ConfiguredObject) -> Result<(), ModelError> {
		match self.pages() {
			Some(pages) if pages > 0 => Ok(()),
			other => Err(ConfigError::validation(book, format!("pages must be positive, got {other:?}")).into()),
		}
	}
}

fn new_shelf() -> Box<dyn ObjectBehavior> {
	Box::new(Shelf::default())
}

fn new_book() -> Box<dyn ObjectBehavior> {
	Box::new(Book::default())
}

fn get_pages(book: &ConfiguredObject) -> Option<AttrValue> {
	book.behavior::<Book>()?.pages().map(AttrValue::Int)
}

fn set_pages(book: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(b) = book.behavior::<Book>() {
		*b.pages.write() = value.and_then(|v| v.as_i64());
	}
}

fn library() -> Model {
	init_tracing();
	let registry = TypeRegistry::new();
	registry
		.register_all(&[&PLAIN_SHELF, &PAPERBACK])
		.expect("library types register");
	let graph = CategoryGraph::new().root(SHELF).relate(SHELF, BOOK);
	Model::new(Arc::new(registry), graph, ModelConfig::default()).expect("writer thread starts")
}

#[test]
fn validation_sees_resolved_children() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("fiction"), Vec::new()).unwrap();
	let first = model.construct_object(BOOK, named("first"), vec![shelf.clone()]).unwrap();
	let second = model
		.construct_object(BOOK, attrs([("name", "second".into()), ("pages", "250".into())]), vec![shelf.clone()])
		.unwrap();

	assert_eq!(first.phase(), LifecyclePhase::Constructed);
	assert_eq!(first.behavior::<Book>().and_then(Book::pages), None);
	assert_eq!(first.state(), State::Uninitialized);

	shelf.open().unwrap();

	let seen = shelf.behavior::<Shelf>().unwrap().validated_pages.read().clone();
	assert_eq!(seen, vec![100, 250]);
	for object in [&shelf, &first, &second] {
		assert_eq!(object.phase(), LifecyclePhase::Opened, "{object}");
		assert_eq!(object.state(), State::Active, "{object}");
		assert!(object.is_open());
	}
}

#[test]
fn open_runs_once() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("poetry"), Vec::new()).unwrap();
	shelf.open().unwrap();
	*shelf.behavior::<Shelf>().unwrap().validated_pages.write() = vec![-1];
	shelf.open().unwrap();
	assert_eq!(*shelf.behavior::<Shelf>().unwrap().validated_pages.read(), vec![-1]);
}

#[test]
fn failed_open_can_be_retried_after_a_fix() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("drafts"), Vec::new()).unwrap();
	let book = model
		.construct_object(BOOK, attrs([("name", "empty".into()), ("pages", 0.into())]), vec![shelf.clone()])
		.unwrap();

	let err = shelf.open().unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::Validation { .. })), "{err}");
	assert!(!shelf.is_open());
	assert_eq!(book.phase(), LifecyclePhase::Resolved);

	assert_eq!(book.set_attribute("pages", Some(0.into()), Some(12.into())).unwrap(), Some(12.into()));
	shelf.open().unwrap();
	assert_eq!(book.state(), State::Active);
	assert_eq!(book.attribute("pages"), Some(AttrValue::Int(12)));
}

#[test]
fn created_children_are_opened() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("history"), Vec::new()).unwrap();
	let book = shelf.create_child(BOOK, named("annals"), Vec::new()).unwrap().unwrap();
	assert_eq!(book.phase(), LifecyclePhase::Opened);
	assert_eq!(book.attribute("pages"), Some(AttrValue::Int(100)));
	assert_eq!(shelf.child_by_name(BOOK, "annals"), Some(book.clone()));
	assert_eq!(shelf.child_by_id(BOOK, book.id()), Some(book));
}

#[test]
fn failed_child_creation_leaves_nothing_behind() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("broken"), Vec::new()).unwrap();
	let err = shelf
		.create_child(BOOK, attrs([("name", "blank".into()), ("pages", (-3).into())]), Vec::new())
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::Validation { .. })), "{err}");
	assert!(shelf.children(BOOK).is_empty());
	assert_eq!(model.objects().len(), 1);
}

#[test]
fn failed_registration_runs_the_delete_hook() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("twins"), Vec::new()).unwrap();
	let first = model
		.construct_object(BOOK, named("twin-volume"), vec![shelf.clone()])
		.unwrap();
	let err = model
		.construct_object(BOOK, named("twin-volume"), vec![shelf.clone()])
		.unwrap_err();
	assert!(matches!(err, ModelError::DuplicateName { category: BOOK, .. }), "{err}");

	let deleted = DELETED_BOOKS.lock().iter().filter(|name| *name == "twin-volume").count();
	assert_eq!(deleted, 1);
	assert_eq!(shelf.children(BOOK), vec![first]);
}

#[test]
fn missing_mandatory_name_is_not_registered() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("misc"), Vec::new()).unwrap();
	let err = model
		.construct_object(BOOK, attrs([("pages", 10.into())]), vec![shelf.clone()])
		.unwrap_err();
	assert!(
		matches!(
			err,
			ModelError::Config(ConfigError::MissingMandatory {
				category: BOOK,
				attribute: "name"
			})
		),
		"{err}"
	);
	assert!(shelf.children(BOOK).is_empty());
	assert_eq!(model.objects(), vec![shelf]);
}

#[test]
fn wrong_parents_are_rejected() {
	let model = library();
	let err = model.construct_object(BOOK, named("orphan"), Vec::new()).unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::InvalidParents { .. })), "{err}");
	assert!(model.objects().is_empty());
}

#[test]
fn hooks_see_the_calling_subject() {
	let model = library();
	let shelf = Subject::user("librarian")
		.run_as(|| model.construct_object(SHELF, named("reference"), Vec::new()))
		.unwrap();
	assert_eq!(shelf.raw_attribute("createdBy"), Some("librarian".into()));

	let denied = Subject::user("guest").run_as(|| shelf.set_attribute("description", None, Some("mine".into())));
	assert!(matches!(denied, Err(ModelError::AccessDenied(_))));
	assert_eq!(shelf.attribute("description"), None);

	Subject::user("librarian")
		.run_as(|| shelf.set_attribute("description", None, Some("dictionaries".into())))
		.unwrap();
	assert_eq!(shelf.attribute("description"), Some("dictionaries".into()));
	assert_eq!(shelf.raw_attribute("lastUpdatedBy"), Some("librarian".into()));
}

#[test]
fn delete_requires_authorisation() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("archive"), Vec::new()).unwrap();
	let book = shelf.create_child(BOOK, named("ledger"), Vec::new()).unwrap().unwrap();

	let denied = Subject::user("guest").run_as(|| shelf.delete());
	assert!(matches!(denied, Err(ModelError::AccessDenied(_))));
	assert!(!shelf.is_deleted());
	assert!(!book.is_deleted());

	Subject::system().run_as(|| shelf.delete()).unwrap();
	assert!(shelf.is_deleted());
	assert!(book.is_deleted());
	assert!(model.objects().is_empty());
	assert!(matches!(shelf.open(), Err(ModelError::Deleted(id)) if id == shelf.id()));
}

#[test]
fn mutations_fail_after_shutdown() {
	let model = library();
	let shelf = model.construct_object(SHELF, named("closing"), Vec::new()).unwrap();
	shelf.open().unwrap();
	assert!(model.executor_stats().submitted >= 2);

	model.shutdown();
	let err = shelf.set_attribute("description", None, Some("late".into())).unwrap_err();
	assert!(matches!(err, ModelError::Executor(ExecutorError::Stopped(_))), "{err}");
	assert_eq!(shelf.attribute("description"), None);
}
