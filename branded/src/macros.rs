/// Declares the process-wide generation conventions.
///
/// At most one declaration may exist across the scanned sources. The body is
/// read by `branded-build`; at compile time the macro expands to nothing.
///
/// ```ignore
/// branded::conventions! {
///     type_name_pattern = r"Id$",
/// }
/// ```
#[macro_export]
macro_rules! conventions {
    ($($tokens:tt)*) => {};
}

/// Declares a decoration applied to every (or a filtered subset of)
/// generated wrapper types.
///
/// The target is a macro invoked once per applicable wrapper in the
/// generated module. `WrapperType`, `InnerType` and `ConverterType` are
/// placeholders resolved per candidate. The body is read by
/// `branded-build`; at compile time the macro expands to nothing.
///
/// ```ignore
/// branded::decorate! {
///     target = my_serde::register,
///     args = [[JsonViaConverter<_, _>, WrapperType, ConverterType]],
///     named_args = ["kind", "int32"],
///     only_for = [i32],
/// }
/// ```
#[macro_export]
macro_rules! decorate {
    ($($tokens:tt)*) => {};
}
