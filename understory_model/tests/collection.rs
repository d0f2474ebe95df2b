// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collections of models and collections stored in models.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::Person;
use understory_model::{
    ChangeTrackingModelBase, ChangeTrackingPropertyBag, ClassMetadataBuilder,
    CollectionChangedAction, EditablePropertyBag, ModelCollection, Reflect, Shared,
    ValidationResult,
};

type Roster = ModelCollection<Shared<Person>, EditablePropertyBag>;
type Members = ModelCollection<Shared<Person>, ChangeTrackingPropertyBag>;

fn roster() -> Roster {
    let mut roster = Roster::new();
    roster.push(Person::named("Ann", "Lee"));
    roster.push(Person::named("Bob", "Ray"));
    roster.accept_changes().unwrap();
    roster
}

#[test]
fn changed_people_make_the_roster_changed() {
    let mut roster = roster();
    assert!(!roster.is_changed());

    let ann = roster.get(0).unwrap().clone();
    ann.borrow_mut().set_age(33);
    assert!(roster.is_changed());
    assert!(!roster.is_changed_local());

    roster.reject_changes().unwrap();
    assert_eq!(ann.borrow().age(), 0);
    assert_eq!(roster.len(), 2);
    assert!(!roster.is_changed());
}

#[test]
fn people_turning_dirty_announce_is_changed_on_the_roster() {
    let mut roster = roster();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    roster
        .model_mut()
        .subscribe_property_changed(move |args| sink.borrow_mut().push(args.property_name()));
    let ann = roster.get(0).unwrap().clone();

    ann.borrow_mut().set_age(33);
    assert_eq!(*changes.borrow(), ["IsChanged"]);
    ann.borrow_mut().set_age(0);
    assert_eq!(*changes.borrow(), ["IsChanged", "IsChanged"]);
    assert!(!roster.is_changed());

    assert!(roster.remove(&ann));
    changes.borrow_mut().clear();
    ann.borrow_mut().set_age(40);
    assert!(changes.borrow().is_empty());
}

#[test]
fn reject_restores_membership() {
    let mut roster = roster();
    let bob = roster.remove_at(1).unwrap();
    roster.insert(0, Person::named("Cy", "Fox")).unwrap();
    assert!(roster.is_changed_local());

    roster.reject_changes().unwrap();
    assert_eq!(roster.len(), 2);
    assert!(roster.get(1).is_some_and(|person| person.ptr_eq(&bob)));
    assert!(!roster.is_changed_local());
}

#[test]
fn edit_session_covers_the_list_and_the_people() {
    let mut roster = roster();
    let ann = roster.get(0).unwrap().clone();

    roster.begin_edit().unwrap();
    assert!(ann.borrow().base().is_editing());
    ann.borrow_mut().set_first_name(Some("Anna"));
    roster.push(Person::named("Cy", "Fox"));
    roster.cancel_edit().unwrap();

    assert_eq!(roster.len(), 2);
    assert_eq!(ann.borrow().first_name().as_deref(), Some("Ann"));
    assert!(!ann.borrow().base().is_editing());
    assert!(!roster.is_changed());
}

#[test]
fn collection_level_properties_and_errors() {
    #[derive(Debug)]
    struct Team;

    impl Reflect for Team {
        fn describe(class: &mut ClassMetadataBuilder) {
            class.property::<Option<String>>("Name");
            class.validate_object_with(|context, results| {
                if context.get::<Option<String>>("Name").is_none_or(Option::is_none) {
                    results.push(ValidationResult::for_member("A team needs a name.", "Name"));
                }
            });
        }
    }

    let mut team = ModelCollection::<Shared<Person>, ChangeTrackingPropertyBag>::with_class::<Team>();
    assert!(!team.model_mut().validate());
    assert_eq!(team.model().get_errors("Name").len(), 1);

    team.model_mut().set(Some(String::from("Core")), "Name");
    assert!(!team.model().has_errors());
    assert!(team.is_changed_local());
    team.accept_changes().unwrap();
    assert!(!team.is_changed());
}

#[derive(Debug)]
struct Department {
    base: ChangeTrackingModelBase,
}

impl Reflect for Department {
    fn describe(class: &mut ClassMetadataBuilder) {
        class.property::<Option<Shared<Members>>>("Members");
    }
}

impl Department {
    fn new() -> Self {
        Self {
            base: ChangeTrackingModelBase::new::<Self>(),
        }
    }

    fn set_members(&mut self, members: Option<Shared<Members>>, additions: &Rc<Cell<u32>>) {
        let additions = Rc::clone(additions);
        self.base.set_collection(
            members,
            move |args| {
                if args.action() == CollectionChangedAction::Add {
                    additions.set(additions.get() + 1);
                }
            },
            "Members",
        );
    }
}

#[test]
fn stored_collections_are_observed_and_tracked() {
    let additions = Rc::new(Cell::new(0));
    let first = Shared::new(Members::new());
    let second = Shared::new(Members::new());
    let mut department = Department::new();

    department.set_members(Some(first.clone()), &additions);
    department.base.accept_changes().unwrap();
    first.borrow_mut().push(Person::named("Ann", "Lee"));
    assert_eq!(additions.get(), 1);
    assert!(department.base.is_changed());
    assert!(!department.base.is_changed_local());

    department.base.accept_changes().unwrap();
    assert!(!first.borrow().is_changed());

    department.set_members(Some(second.clone()), &additions);
    first.borrow_mut().push(Person::named("Bob", "Ray"));
    second.borrow_mut().push(Person::named("Cy", "Fox"));
    assert_eq!(additions.get(), 2);
}
