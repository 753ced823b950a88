//! Built-in resolvers.

use async_trait::async_trait;
use url::Url;

use super::resolver::{ArgumentContext, Resolver, ResolverStore};
use crate::error::ArgumentResult;
use crate::message::{ChannelId, RoleId, UserId};

const TRUTHS: [&str; 6] = ["1", "true", "+", "t", "yes", "y"];
const FALSES: [&str; 6] = ["0", "false", "-", "f", "no", "n"];

/// Registers every built-in resolver in `store`.
pub fn register_defaults(store: &mut ResolverStore) {
    store
        .register(BooleanResolver)
        .register(IntegerResolver)
        .register(FloatResolver)
        .register(NumberResolver)
        .register(StringResolver)
        .register(HyperlinkResolver)
        .register(UserResolver)
        .register(ChannelResolver)
        .register(RoleResolver);
}

/// Formats a bound without a trailing `.0` for whole numbers.
fn fmt_bound(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Resolves `1 true + t yes y` and `0 false - f no n`, case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanResolver;

#[async_trait]
impl Resolver for BooleanResolver {
    type Output = bool;

    fn name(&self) -> &str {
        "boolean"
    }

    async fn run(&self, parameter: &str, _context: &ArgumentContext<'_>) -> ArgumentResult<bool> {
        let lowered = parameter.to_lowercase();
        if TRUTHS.contains(&lowered.as_str()) {
            return Ok(true);
        }
        if FALSES.contains(&lowered.as_str()) {
            return Ok(false);
        }
        Err(self.error(
            parameter,
            "ArgumentBooleanInvalidBoolean",
            "The argument did not resolve to a boolean.",
        ))
    }
}

/// Resolves whole numbers into `i64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerResolver;

impl IntegerResolver {
    fn parse(parameter: &str) -> Option<i64> {
        let trimmed = parameter.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Some(value);
        }
        // Accept "2.0" and "1e3" the way numeric literals would
        let value = trimmed.parse::<f64>().ok()?;
        // `i64::MAX as f64` rounds up to 2^63, which is already out of range
        let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
        if value.is_finite() && value.fract() == 0.0 && in_range {
            return Some(value as i64);
        }
        None
    }
}

#[async_trait]
impl Resolver for IntegerResolver {
    type Output = i64;

    fn name(&self) -> &str {
        "integer"
    }

    async fn run(&self, parameter: &str, context: &ArgumentContext<'_>) -> ArgumentResult<i64> {
        let Some(parsed) = Self::parse(parameter) else {
            return Err(self.error(
                parameter,
                "ArgumentIntegerInvalidNumber",
                "The argument did not resolve to an integer.",
            ));
        };
        if context.below_minimum(parsed as f64) {
            return Err(self.error(
                parameter,
                "ArgumentIntegerTooSmall",
                format!(
                    "The argument must be greater than {}.",
                    fmt_bound(context.options.minimum)
                ),
            ));
        }
        if context.above_maximum(parsed as f64) {
            return Err(self.error(
                parameter,
                "ArgumentIntegerTooBig",
                format!(
                    "The argument must be less than {}.",
                    fmt_bound(context.options.maximum)
                ),
            ));
        }
        Ok(parsed)
    }
}

/// Parses a finite or infinite float, rejecting NaN.
fn parse_f64(parameter: &str) -> Option<f64> {
    parameter
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
}

/// Resolves floating point numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatResolver;

#[async_trait]
impl Resolver for FloatResolver {
    type Output = f64;

    fn name(&self) -> &str {
        "float"
    }

    async fn run(&self, parameter: &str, context: &ArgumentContext<'_>) -> ArgumentResult<f64> {
        let Some(parsed) = parse_f64(parameter) else {
            return Err(self.error(
                parameter,
                "ArgumentFloatInvalidFloat",
                "The argument did not resolve to a valid floating point number.",
            ));
        };
        if context.below_minimum(parsed) {
            return Err(self.error(
                parameter,
                "ArgumentFloatTooSmall",
                format!(
                    "The argument must be greater than {}.",
                    fmt_bound(context.options.minimum)
                ),
            ));
        }
        if context.above_maximum(parsed) {
            return Err(self.error(
                parameter,
                "ArgumentFloatTooBig",
                format!(
                    "The argument must be less than {}.",
                    fmt_bound(context.options.maximum)
                ),
            ));
        }
        Ok(parsed)
    }
}

/// Resolves any number.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberResolver;

#[async_trait]
impl Resolver for NumberResolver {
    type Output = f64;

    fn name(&self) -> &str {
        "number"
    }

    async fn run(&self, parameter: &str, context: &ArgumentContext<'_>) -> ArgumentResult<f64> {
        let Some(parsed) = parse_f64(parameter) else {
            return Err(self.error(
                parameter,
                "ArgumentNumberInvalidNumber",
                "The argument did not resolve to a valid number.",
            ));
        };
        if context.below_minimum(parsed) {
            return Err(self.error(
                parameter,
                "ArgumentNumberTooSmall",
                format!(
                    "The argument must be greater than {}.",
                    fmt_bound(context.options.minimum)
                ),
            ));
        }
        if context.above_maximum(parsed) {
            return Err(self.error(
                parameter,
                "ArgumentNumberTooBig",
                format!(
                    "The argument must be smaller than {}.",
                    fmt_bound(context.options.maximum)
                ),
            ));
        }
        Ok(parsed)
    }
}

/// Resolves the parameter as-is, with optional length bounds in characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringResolver;

#[async_trait]
impl Resolver for StringResolver {
    type Output = String;

    fn name(&self) -> &str {
        "string"
    }

    async fn run(&self, parameter: &str, context: &ArgumentContext<'_>) -> ArgumentResult<String> {
        let length = parameter.chars().count() as f64;
        if context.below_minimum(length) {
            return Err(self.error(
                parameter,
                "ArgumentStringTooShort",
                format!(
                    "The argument must be greater than {} characters.",
                    fmt_bound(context.options.minimum)
                ),
            ));
        }
        if context.above_maximum(length) {
            return Err(self.error(
                parameter,
                "ArgumentStringTooLong",
                format!(
                    "The argument must be less than {} characters.",
                    fmt_bound(context.options.maximum)
                ),
            ));
        }
        Ok(parameter.to_string())
    }
}

/// Resolves absolute URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HyperlinkResolver;

#[async_trait]
impl Resolver for HyperlinkResolver {
    type Output = Url;

    fn name(&self) -> &str {
        "hyperlink"
    }

    fn aliases(&self) -> &[&'static str] {
        &["url"]
    }

    async fn run(&self, parameter: &str, _context: &ArgumentContext<'_>) -> ArgumentResult<Url> {
        Url::parse(parameter).map_err(|_| {
            self.error(
                parameter,
                "ArgumentHyperlinkInvalidURL",
                "The argument did not resolve to a valid URL.",
            )
        })
    }
}

/// Extracts a 17-19 digit snowflake from `<{open}ID>` or a bare `ID`.
///
/// `open` lists the accepted mention openers, longest first.
fn parse_snowflake<'a>(parameter: &'a str, open: &[&str]) -> Option<&'a str> {
    let inner = open
        .iter()
        .find_map(|o| {
            parameter
                .strip_prefix(o)
                .and_then(|rest| rest.strip_suffix('>'))
        })
        .unwrap_or(parameter);
    let is_snowflake =
        (17..=19).contains(&inner.len()) && inner.bytes().all(|b| b.is_ascii_digit());
    is_snowflake.then_some(inner)
}

/// Resolves user mentions (`<@ID>`, `<@!ID>`) and raw user ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResolver;

#[async_trait]
impl Resolver for UserResolver {
    type Output = UserId;

    fn name(&self) -> &str {
        "user"
    }

    async fn run(&self, parameter: &str, _context: &ArgumentContext<'_>) -> ArgumentResult<UserId> {
        parse_snowflake(parameter, &["<@!", "<@"])
            .map(UserId::from)
            .ok_or_else(|| {
                self.error(
                    parameter,
                    "ArgumentUserUnknownUser",
                    "The argument did not resolve to a user.",
                )
            })
    }
}

/// Resolves channel mentions (`<#ID>`) and raw channel ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelResolver;

#[async_trait]
impl Resolver for ChannelResolver {
    type Output = ChannelId;

    fn name(&self) -> &str {
        "channel"
    }

    async fn run(
        &self,
        parameter: &str,
        _context: &ArgumentContext<'_>,
    ) -> ArgumentResult<ChannelId> {
        parse_snowflake(parameter, &["<#"])
            .map(ChannelId::from)
            .ok_or_else(|| {
                self.error(
                    parameter,
                    "ArgumentChannelMissingChannel",
                    "The argument did not resolve to a channel.",
                )
            })
    }
}

/// Resolves role mentions (`<@&ID>`) and raw role ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleResolver;

#[async_trait]
impl Resolver for RoleResolver {
    type Output = RoleId;

    fn name(&self) -> &str {
        "role"
    }

    async fn run(&self, parameter: &str, _context: &ArgumentContext<'_>) -> ArgumentResult<RoleId> {
        parse_snowflake(parameter, &["<@&"])
            .map(RoleId::from)
            .ok_or_else(|| {
                self.error(
                    parameter,
                    "ArgumentRoleMissingRole",
                    "The argument did not resolve to a role.",
                )
            })
    }
}
