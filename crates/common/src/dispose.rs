/// A resource that must be released explicitly, exactly once.
///
/// Release consumes the box, so a disposed resource cannot be reached again.
pub trait Disposable {
    /// Short name used in teardown logs.
    fn name(&self) -> &str;

    fn dispose(self: Box<Self>);
}
