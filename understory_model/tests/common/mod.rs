// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Models shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use understory_model::{
    ChangeTracking, ClassMetadataBuilder, EditableObject, EditableObjectModelBase, EventHandler,
    ModelObject, NotifyPropertyChanged, PropertyChangedEventArgs, Range, Reflect, Required,
    Shared, StringLength, SubscriptionId,
};

/// A person with a calculated full name and an optional boss.
#[derive(Debug)]
pub struct Person {
    base: EditableObjectModelBase,
    boss_notifications: Rc<Cell<u32>>,
}

impl Reflect for Person {
    fn describe(class: &mut ClassMetadataBuilder) {
        class.table("People");
        class
            .property::<Option<String>>("FirstName")
            .display_name("First name")
            .validate(Required::new())
            .validate(StringLength::max(20));
        class.property::<Option<String>>("LastName");
        class
            .property::<String>("FullName")
            .read_only()
            .not_mapped()
            .calculated_from(&["FirstName", "LastName"]);
        class.property::<u32>("Age").validate(Range::new(0.0, 130.0));
        class.property::<Option<Shared<Person>>>("Boss").not_mapped();
    }
}

impl Person {
    pub fn new() -> Self {
        Self {
            base: EditableObjectModelBase::new::<Self>(),
            boss_notifications: Rc::default(),
        }
    }

    pub fn named(first: &str, last: &str) -> Shared<Self> {
        let mut person = Self::new();
        person.set_first_name(Some(first));
        person.set_last_name(Some(last));
        person.base.accept_changes().unwrap();
        Shared::new(person)
    }

    pub fn base(&self) -> &EditableObjectModelBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut EditableObjectModelBase {
        &mut self.base
    }

    pub fn first_name(&self) -> Option<String> {
        self.base.get("FirstName")
    }

    pub fn set_first_name(&mut self, value: Option<&str>) -> bool {
        self.base.set(value.map(str::to_owned), "FirstName")
    }

    pub fn last_name(&self) -> Option<String> {
        self.base.get("LastName")
    }

    pub fn set_last_name(&mut self, value: Option<&str>) -> bool {
        self.base.set(value.map(str::to_owned), "LastName")
    }

    pub fn full_name(&self) -> String {
        let first = self.first_name().unwrap_or_default();
        let last = self.last_name().unwrap_or_default();
        format!("{first} {last}").trim().to_owned()
    }

    pub fn age(&self) -> u32 {
        self.base.get("Age")
    }

    pub fn set_age(&mut self, value: u32) -> bool {
        self.base.set(value, "Age")
    }

    pub fn boss(&self) -> Option<Shared<Self>> {
        self.base.get("Boss")
    }

    /// Stores the boss and counts the property changes it raises afterwards.
    pub fn set_boss(&mut self, boss: Option<Shared<Self>>) -> bool {
        let counter = Rc::clone(&self.boss_notifications);
        self.base
            .set_child(boss, move |_| counter.set(counter.get() + 1), "Boss")
    }

    pub fn boss_notifications(&self) -> u32 {
        self.boss_notifications.get()
    }
}

impl ModelObject for Person {
    fn as_change_tracking(&self) -> Option<&dyn ChangeTracking> {
        Some(&self.base)
    }

    fn as_change_tracking_mut(&mut self) -> Option<&mut dyn ChangeTracking> {
        Some(&mut self.base)
    }

    fn as_editable_mut(&mut self) -> Option<&mut dyn EditableObject> {
        Some(&mut self.base)
    }
}

impl NotifyPropertyChanged for Person {
    fn subscribe_property_changed(
        &mut self,
        handler: EventHandler<PropertyChangedEventArgs>,
    ) -> SubscriptionId {
        NotifyPropertyChanged::subscribe_property_changed(&mut self.base, handler)
    }

    fn unsubscribe_property_changed(&mut self, id: SubscriptionId) -> bool {
        self.base.unsubscribe_property_changed(id)
    }
}

/// Records property-changed names raised by a model.
pub fn record_changes(person: &mut Person) -> Rc<RefCell<Vec<&'static str>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    person
        .base_mut()
        .subscribe_property_changed(move |args| sink.borrow_mut().push(args.property_name()));
    log
}

/// Records errors-changed names raised by a model.
pub fn record_errors(person: &mut Person) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    person.base_mut().subscribe_errors_changed(move |args| {
        sink.borrow_mut().push(args.property_name().to_owned());
    });
    log
}
