use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use bindery::prelude::*;
use bindery::{MapConverter, ResolutionErrorKind, Subscription};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

fn person(name: &str) -> Rc<PropertyBag> {
    PropertyBag::builder("Person").property("Name", name).build()
}

fn count_changes(object: &dyn PropertyObject, property: &str) -> (Rc<Cell<usize>>, Subscription) {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    let sub = object
        .subscribe(property, Box::new(move |_| c.set(c.get() + 1)))
        .unwrap();
    (count, sub)
}

#[test]
fn text_box_edits_reach_the_model() {
    let model = person("Alice");
    let text_box = Widget::text_box();
    let _binding = text_box
        .bind("Text", &model, "Name", BindingDirection::TwoWay)
        .unwrap();
    assert_eq!(text_box.get("Text"), Some(Value::from("Alice")));

    text_box.set("Text", "Bob".into()).unwrap();
    assert_eq!(model.get("Name"), Some(Value::from("Bob")));

    model.set("Name", "Carol".into()).unwrap();
    assert_eq!(text_box.get("Text"), Some(Value::from("Carol")));
}

#[test]
fn null_target_becomes_placeholder_in_source() {
    let model = person("Alice");
    let text_box = Widget::text_box();
    let _binding = text_box
        .bind_with(
            "Text",
            &model,
            "Name",
            BindOptions::new()
                .direction(BindingDirection::TwoWay)
                .default_source_value("N/A"),
        )
        .unwrap();

    text_box.set("Text", Value::Null).unwrap();
    assert_eq!(model.get("Name"), Some(Value::from("N/A")));
}

#[test]
fn normalized_source_propagates_once() {
    let model = PropertyBag::builder("Person")
        .normalized("Name", "", |v| match v {
            Value::Text(s) => Value::Text(s.trim().to_owned()),
            other => other,
        })
        .build();
    let text_box = Widget::text_box();
    let _binding = text_box.bind_two_way("Text", &model, "Name").unwrap();
    let (writes, _sub) = count_changes(&*text_box, "Text");

    model.set("Name", "  Alice  ".into()).unwrap();
    assert_eq!(writes.get(), 1);
    assert_eq!(text_box.get("Text"), Some(Value::from("Alice")));

    text_box.set("Text", " Bob ".into()).unwrap();
    assert_eq!(model.get("Name"), Some(Value::from("Bob")));
    assert_eq!(text_box.get("Text"), Some(Value::from("Bob")));
}

#[test]
fn clearing_three_bindings_leaves_no_subscribers() {
    let model = PropertyBag::builder("Contact")
        .property("First", "Ada")
        .property("Last", "Lovelace")
        .property("Email", "ada@example.com")
        .build();
    let form = Widget::new(
        PropertyBag::builder("Form")
            .property("First", "")
            .property("Last", "")
            .property("Email", ""),
    );
    for field in ["First", "Last", "Email"] {
        let _binding = form.bind_two_way(field, &model, field).unwrap();
    }
    assert_eq!(form.bindings().active_count(), 3);
    assert_eq!(model.total_subscribers(), 3);
    assert_eq!(form.total_subscribers(), 3);

    form.bindings().clear();
    assert_eq!(model.total_subscribers(), 0);
    assert_eq!(form.total_subscribers(), 0);

    model.set("First", "Grace".into()).unwrap();
    assert_eq!(form.get("First"), Some(Value::from("Ada")));
}

#[test]
fn destroying_widget_releases_model() {
    let model = person("Alice");
    let label = Widget::label();
    let binding = label
        .bind("Text", &model, "Name", BindingDirection::OneWay)
        .unwrap();
    assert_eq!(model.subscriber_count("Name"), 1);

    drop(label);
    assert!(!binding.is_bound());
    assert_eq!(model.subscriber_count("Name"), 0);
}

#[test]
fn nested_paths() {
    let address = PropertyBag::builder("Address")
        .property("City", "London")
        .build();
    let addr: ObjectRef = address.clone();
    let model = PropertyBag::builder("Person")
        .property("Name", "Alice")
        .property("Address", addr)
        .build();
    let city = Widget::label();
    let _binding = city
        .bind("Text", &model, "Address.City", BindingDirection::OneWay)
        .unwrap();
    assert_eq!(city.get("Text"), Some(Value::from("London")));

    address.set("City", "Paris".into()).unwrap();
    assert_eq!(city.get("Text"), Some(Value::from("Paris")));

    let kind = |path: &str| match city.bind("Text", &model, path, BindingDirection::OneWay) {
        Err(BindError::Resolution(err)) => Some(err.kind),
        _ => None,
    };
    assert_eq!(kind("Address.Zip"), Some(ResolutionErrorKind::Missing));
    assert_eq!(kind("Name.City"), Some(ResolutionErrorKind::NotAnObject));
    assert_eq!(city.bindings().len(), 1);
}

#[test]
fn manual_sync_against_direction_is_an_error() {
    let model = person("Alice");
    let label = Widget::label();
    let binding = label
        .bind("Text", &model, "Name", BindingDirection::OneWay)
        .unwrap();
    assert!(matches!(binding.update_source(), Err(BindError::Direction(_))));
    assert_eq!(binding.update_target(), Ok(false));
}

#[test]
fn numeric_field_defaults_skip_the_converter() {
    let stats = PropertyBag::builder("Stats").property("Count", Value::Null).build();
    let field = Widget::text_box();
    let _binding = field
        .bind_with(
            "Text",
            &stats,
            "Count",
            BindOptions::new()
                .converter(MapConverter::new(
                    |v| Value::Text(v.to_string()),
                    |v| match v.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
                        Some(n) => Value::Int(n),
                        None => Value::Null,
                    },
                ))
                .default_widget_value("")
                .default_source_value(0),
        )
        .unwrap();
    assert_eq!(field.get("Text"), Some(Value::from("")));

    field.set("Text", " 7 ".into()).unwrap();
    assert_eq!(stats.get("Count"), Some(Value::Int(7)));

    field.set("Text", Value::Null).unwrap();
    assert_eq!(stats.get("Count"), Some(Value::Int(0)));
}

#[test]
fn detail_form_follows_selection() {
    let people: Vec<ObjectRef> = ["Alice", "Bob"]
        .into_iter()
        .map(|name| person(name) as ObjectRef)
        .collect();
    let form = Widget::new(
        PropertyBag::builder("Form")
            .property("Title", "")
            .property("Name", ""),
    );
    let _title = form
        .bind_context(
            "Title",
            "Name",
            BindOptions::new()
                .direction(BindingDirection::OneWay)
                .default_widget_value("(nothing selected)"),
        )
        .unwrap();
    let _name = form.bind_context("Name", "Name", BindOptions::new()).unwrap();
    assert_eq!(form.get("Title"), Some(Value::from("(nothing selected)")));

    for (i, selected) in people.iter().enumerate() {
        form.set_data_context(Some(Rc::clone(selected))).unwrap();
        assert_eq!(form.get("Title"), selected.get("Name"));
        form.set("Name", format!("Edited {i}").into()).unwrap();
        assert_eq!(selected.get("Name"), Some(Value::from(format!("Edited {i}"))));
        assert_eq!(form.get("Title"), Some(Value::from(format!("Edited {i}"))));
    }
    assert_eq!(people[0].get("Name"), Some(Value::from("Edited 0")));

    form.set_data_context(None).unwrap();
    assert_eq!(form.get("Title"), Some(Value::from("(nothing selected)")));
    assert_eq!(people[1].get("Name"), Some(Value::from("Edited 1")));
}

#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<&'static str>>>);

impl<S: tracing::Subscriber> Layer<S> for SpanNames {
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: Context<'_, S>,
    ) {
        self.0.lock().unwrap().push(attrs.metadata().name());
    }
}

#[test]
fn bind_is_instrumented() {
    let spans = SpanNames::default();
    let subscriber = tracing_subscriber::registry().with(spans.clone());
    tracing::subscriber::with_default(subscriber, || {
        let model = person("Alice");
        let text_box = Widget::text_box();
        let _binding = text_box.bind_two_way("Text", &model, "Name").unwrap();
    });
    assert!(spans.0.lock().unwrap().contains(&"bind"));
}
