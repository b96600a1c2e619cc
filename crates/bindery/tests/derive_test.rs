#[test]
fn test_derives_expand() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/message_default_name.rs");
    t.pass("tests/ui/service_with_events.rs");
    t.pass("tests/ui/service_crate_path.rs");
}
