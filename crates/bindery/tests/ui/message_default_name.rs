use bindery::Message;

#[derive(Message, Default, Clone)]
struct Untitled {
    _value: u8,
}

#[derive(Message, Default, Clone)]
#[message(name = "demo/msg/Titled")]
struct Titled;

#[derive(Message, Default, Clone)]
struct Wrapper<T: Default + Clone + Send + Sync + 'static> {
    _inner: T,
}

fn main() {
    assert_eq!(<Untitled as Message>::TYPE_NAME, "Untitled");
    assert_eq!(<Titled as Message>::TYPE_NAME, "demo/msg/Titled");
    assert_eq!(<Wrapper<u32> as Message>::TYPE_NAME, "Wrapper");
}
