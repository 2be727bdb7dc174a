#[doc(hidden)]
#[macro_export]
macro_rules! cfg_tracing_adapter {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "tracing-adapter")]
            #[cfg_attr(docsrs, doc(cfg(feature = "tracing-adapter")))]
            $item
        )*
    }
}
