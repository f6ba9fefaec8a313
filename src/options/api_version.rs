// self
use crate::_prelude::*;

/// REST API version rendered as `v<major>.<minor>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion {
	/// Major release number (`33` in `v33.0`).
	pub major: u16,
	/// Minor release number.
	pub minor: u16,
}
impl ApiVersion {
	/// Version used when options do not pin one.
	pub const DEFAULT: Self = Self::new(33, 0);

	/// Creates a version label.
	pub const fn new(major: u16, minor: u16) -> Self {
		Self { major, minor }
	}
}
impl Default for ApiVersion {
	fn default() -> Self {
		Self::DEFAULT
	}
}
impl Display for ApiVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "v{}.{}", self.major, self.minor)
	}
}
impl FromStr for ApiVersion {
	type Err = ApiVersionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let raw = s.trim();
		let digits = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
		let (major, minor) = digits.split_once('.').unwrap_or((digits, "0"));
		let invalid = || ApiVersionError { value: s.to_owned() };
		let major = major.parse().map_err(|_| invalid())?;
		let minor = minor.parse().map_err(|_| invalid())?;

		Ok(Self { major, minor })
	}
}
impl TryFrom<String> for ApiVersion {
	type Error = ApiVersionError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl From<ApiVersion> for String {
	fn from(value: ApiVersion) -> Self {
		value.to_string()
	}
}

/// Error returned when an API version label cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("`{value}` is not a valid API version.")]
pub struct ApiVersionError {
	/// Rejected input.
	pub value: String,
}
