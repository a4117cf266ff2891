/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` declares a configuration struct with the default of every
/// field embedded next to its type, and generates:
/// - The struct with public fields
/// - The `Default` implementation
/// - Serde support with `#[serde(default)]`, so partial TOML files load
///
/// # Example
/// ```ignore
/// config_struct! {
///     pub struct PricingConfig {
///         poll_interval_secs: u64 = 30,
///         base_url: String = "https://api.coingecko.com/api/v3".to_string(),
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
