use std::rc::Rc;

use bindery::prelude::*;
use proptest::prelude::*;

fn model(name: &str) -> Rc<PropertyBag> {
    PropertyBag::builder("Model").property("Name", name).build()
}

fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-zA-Z ]{0,12}".prop_map(Value::Text),
    ]
}

proptest! {
    #[test]
    fn two_way_target_matches_source_after_construction(name in "[a-zA-Z ]{0,16}", text in "[a-z]{0,8}") {
        let person = model(&name);
        let field = Widget::text_box();
        field.set("Text", text.into()).unwrap();

        let _binding = field.bind_two_way("Text", &person, "Name").unwrap();
        prop_assert_eq!(field.get("Text"), person.get("Name"));
    }

    #[test]
    fn two_way_stays_in_sync(writes in prop::collection::vec((any::<bool>(), any_value()), 1..16)) {
        let person = model("");
        let field = Widget::text_box();
        let _binding = field.bind_two_way("Text", &person, "Name").unwrap();

        for (to_widget, v) in writes {
            if to_widget {
                field.set("Text", v).unwrap();
            } else {
                person.set("Name", v).unwrap();
            }
            prop_assert_eq!(field.get("Text"), person.get("Name"));
        }
    }

    #[test]
    fn one_way_never_writes_source(writes in prop::collection::vec(any_value(), 1..16)) {
        let person = model("Alice");
        let field = Widget::text_box();
        let _binding = field
            .bind("Text", &person, "Name", BindingDirection::OneWay)
            .unwrap();

        for v in writes {
            field.set("Text", v).unwrap();
            prop_assert_eq!(person.get("Name"), Some(Value::from("Alice")));
        }
    }

    #[test]
    fn one_way_to_source_never_writes_target(writes in prop::collection::vec(any_value(), 1..16)) {
        let person = model("Alice");
        let field = Widget::text_box();
        field.set("Text", "typed".into()).unwrap();
        let _binding = field
            .bind("Text", &person, "Name", BindingDirection::OneWayToSource)
            .unwrap();
        prop_assert_eq!(person.get("Name"), Some(Value::from("typed")));

        for v in writes {
            person.set("Name", v).unwrap();
            prop_assert_eq!(field.get("Text"), Some(Value::from("typed")));
        }
    }

    #[test]
    fn unbind_twice_equals_once(direction in prop_oneof![
        Just(BindingDirection::OneWay),
        Just(BindingDirection::OneWayToSource),
        Just(BindingDirection::TwoWay),
    ], after in any_value()) {
        let person = model("Alice");
        let field = Widget::text_box();
        let binding = field.bind("Text", &person, "Name", direction).unwrap();
        let text_before = field.get("Text");

        binding.unbind();
        binding.unbind();
        prop_assert!(!binding.is_bound());
        prop_assert_eq!(person.total_subscribers(), 0);
        prop_assert_eq!(field.total_subscribers(), 0);

        person.set("Name", after.clone()).unwrap();
        prop_assert_eq!(field.get("Text"), text_before);
        field.set("Text", Value::from("later")).unwrap();
        prop_assert_eq!(person.get("Name"), Some(after));
    }
}
