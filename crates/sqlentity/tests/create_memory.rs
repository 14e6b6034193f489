use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};

use sqlentity::prelude::*;
use sqlentity::{Dialect, QueryErrorKind, ValidationErrorKind};
use sqlentity_memory::MemoryConnection;

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

fn unwrap_err<T>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        Outcome::Ok(_) => panic!("expected an error"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .define(
            "pet",
            [
                ("name", FieldSpec::text().default_value("Mutt")),
                ("age", FieldSpec::number()),
            ],
        )
        .unwrap();
    registry
        .define("pen", [("colour", FieldSpec::text())])
        .unwrap();
    registry
        .define("person", [("name", FieldSpec::text().required())])
        .unwrap();
    registry
}

#[test]
fn create_applies_insert_defaults() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();

        let mutt = unwrap_outcome(pets.create(&cx, Record::new()).await)
            .into_single()
            .unwrap();
        assert!(mutt.saved());
        assert!(mutt.is_persisted());
        assert_eq!(mutt.get("name"), Some(&Value::from("Mutt")));
        assert_eq!(mutt.get_as::<i64>("id").unwrap(), 1);

        let deco = unwrap_outcome(
            pets.create_one(&cx, Record::new().with("name", "Deco").with("age", 3))
                .await,
        );
        assert_eq!(deco.get("name"), Some(&Value::from("Deco")));
        assert_eq!(deco.get("age"), Some(&Value::BigInt(3)));
    });

    let rows = db.connection().rows("pet");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_by_name("name"), Some(&Value::from("Mutt")));
}

#[test]
fn explicit_null_is_kept_on_insert() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();
        let pet = unwrap_outcome(pets.create_one(&cx, Record::new().with("name", Value::Null)).await);
        assert_eq!(pet.get("name"), Some(&Value::Null));
    });
}

#[test]
fn save_writes_null_for_unset_fields() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();
        let mut ruffy = unwrap_outcome(pets.create_one(&cx, Record::new().with("name", "Ruffy")).await);
        let id = ruffy.get("id").cloned().unwrap();

        ruffy.set("age", 4);
        ruffy.unset("name");
        assert!(!ruffy.saved());
        unwrap_outcome(pets.save(&cx, &mut ruffy).await);
        assert!(ruffy.saved());

        let fetched = unwrap_outcome(pets.get(&cx, id).await);
        assert_eq!(fetched.get("name"), Some(&Value::Null));
        assert_eq!(fetched.get("age"), Some(&Value::BigInt(4)));
    });

    let sql = db.connection().statement_sql();
    assert_eq!(
        sql[1],
        "UPDATE \"pet\" SET \"name\" = $1, \"age\" = $2 WHERE \"id\" = $3"
    );
}

#[test]
fn new_instance_then_save_inserts() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();
        let mut pet = pets.new_instance(Record::new().with("age", 2)).unwrap();
        assert!(!pet.is_persisted());
        assert_eq!(pet.get("name"), Some(&Value::from("Mutt")));

        unwrap_outcome(pets.save(&cx, &mut pet).await);
        assert!(pet.is_persisted());
        assert_eq!(pet.identifier(), Some(vec![Value::BigInt(1)]));

        let people = db.model("person").unwrap();
        let err = unwrap_err(people.save(&cx, &mut pet).await);
        assert!(err.is_validation());
    });
}

#[test]
fn get_reports_missing_rows() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();
        match unwrap_err(pets.get(&cx, 42).await) {
            Error::Query(q) => assert_eq!(q.kind, QueryErrorKind::NotFound),
            other => panic!("expected not found, got {other}"),
        }
        let err = unwrap_err(pets.get_by_key(&cx, &[Value::BigInt(1), Value::BigInt(2)]).await);
        assert!(err.is_validation());
    });
}

#[test]
fn batch_results_follow_input_order() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let people = db.model("person").unwrap();
        let created = unwrap_outcome(
            people
                .create(
                    &cx,
                    vec![
                        Record::new().with("name", "John"),
                        Record::new().with("name", "Jane"),
                    ],
                )
                .await,
        );
        assert_eq!(created.len(), 2);
        let created = created.into_batch();
        assert_eq!(created[0].get("name"), Some(&Value::from("John")));
        assert_eq!(created[1].get("name"), Some(&Value::from("Jane")));
        assert!(created.iter().all(Instance::saved));

        let empty = unwrap_outcome(people.create_many(&cx, Vec::<Record>::new()).await);
        assert!(empty.is_empty());
    });
}

#[test]
fn batch_stops_at_first_failure() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let people = db.model("person").unwrap();
        let err = unwrap_err(
            people
                .create_many(
                    &cx,
                    [
                        Record::new().with("name", "John"),
                        Record::new(),
                        Record::new().with("name", "Jane"),
                    ],
                )
                .await,
        );
        match err {
            Error::Validation(v) => {
                assert!(v.has_kind(ValidationErrorKind::Required));
                assert_eq!(v.errors[0].field, "name");
            }
            other => panic!("expected validation error, got {other}"),
        }
    });

    let rows = db.connection().rows("person");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_by_name("name"), Some(&Value::from("John")));
}

#[test]
fn validation_failure_issues_no_statement() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();
        let err = unwrap_err(pets.create_one(&cx, Record::new().with("age", "old")).await);
        assert!(err.is_validation());
    });
    assert!(db.connection().statements().is_empty());
}

#[test]
fn column_default_fills_explicit_undefined() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        unwrap_outcome(
            db.exec_query(
                &cx,
                "ALTER TABLE ?? ALTER COLUMN ?? SET DEFAULT ?",
                &[Value::from("pen"), Value::from("colour"), Value::from("blue")],
            )
            .await,
        );

        let pens = db.model("pen").unwrap();
        let pen = unwrap_outcome(pens.create_one(&cx, Record::new().with_undefined("colour")).await);
        assert_eq!(pen.get("colour"), Some(&Value::from("blue")));

        let red = unwrap_outcome(pens.create_one(&cx, Record::new().with("colour", "red")).await);
        assert_eq!(red.get("colour"), Some(&Value::from("red")));

        unwrap_outcome(
            db.exec_query(
                &cx,
                "ALTER TABLE ?? ALTER COLUMN ?? DROP DEFAULT",
                &[Value::from("pen"), Value::from("colour")],
            )
            .await,
        );
        let plain = unwrap_outcome(pens.create_one(&cx, Record::new()).await);
        assert_eq!(plain.get("colour"), Some(&Value::Null));
    });
}

#[test]
fn duplicate_explicit_identifier_is_a_driver_error() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::new(MemoryConnection::new(), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();
        unwrap_outcome(pets.create_one(&cx, Record::new()).await);
        let rex = unwrap_outcome(pets.create_one(&cx, Record::new().with("id", 7).with("name", "Rex")).await);
        assert_eq!(rex.get("id"), Some(&Value::BigInt(7)));

        let err = unwrap_err(pets.create_one(&cx, Record::new().with("id", 7)).await);
        assert!(matches!(&err, Error::Query(q) if q.is_unique_violation()));
        assert_eq!(err.sqlstate(), Some("23505"));

        let next = unwrap_outcome(pets.create_one(&cx, Record::new()).await);
        assert_eq!(next.get("id"), Some(&Value::BigInt(8)));
    });
}

#[test]
fn schema_from_json_configuration() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    let mut registry = SchemaRegistry::new();
    registry
        .define_from_json(
            "user",
            serde_json::json!({
                "username": { "type": "string", "required": true, "pattern": "^[a-z]+$" },
                "role": { "type": "enum", "values": ["admin", "member"], "defaultValue": "member" },
                "active": "boolean"
            }),
        )
        .unwrap();
    let db = Database::new(MemoryConnection::new(), registry);

    rt.block_on(async {
        let users = db.model("user").unwrap();
        let record = Record::from_json(serde_json::json!({ "username": "ada", "active": true })).unwrap();
        let ada = unwrap_outcome(users.create_one(&cx, record).await);
        assert_eq!(ada.get("role"), Some(&Value::from("member")));
        assert_eq!(ada.get("active"), Some(&Value::Bool(true)));

        let err = unwrap_err(users.create_one(&cx, Record::new().with("username", "Ada")).await);
        match err {
            Error::Validation(v) => assert!(v.has_kind(ValidationErrorKind::Pattern)),
            other => panic!("expected pattern error, got {other}"),
        }
    });

    assert!(db.model("nobody").is_err());
}

#[test]
fn mysql_dialect_statements() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let db = Database::builder()
        .validate(true)
        .build_with(MemoryConnection::with_dialect(Dialect::Mysql), registry());

    rt.block_on(async {
        let pets = db.model("pet").unwrap();
        unwrap_outcome(pets.create_one(&cx, Record::new().with("name", "Deco")).await);
    });
    assert_eq!(
        db.connection().statement_sql(),
        vec!["INSERT INTO `pet` (`name`) VALUES (?)".to_string()]
    );
}
