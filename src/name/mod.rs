use nom::{
    IResult,
    bytes::complete::{tag, take_while1},
    combinator::{all_consuming, opt},
    sequence::preceded,
};

use crate::error::AdminError;

/// Prefix the service requires for user-managed instance config ids.
pub const CUSTOM_CONFIG_PREFIX: &str = "custom-";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectName {
    pub project: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceConfigName {
    pub project: ProjectName,
    pub config: String,
}

impl ProjectName {
    /// Accepts `my-project` as well as `projects/my-project`.
    pub fn parse(input: &str) -> Result<Self, AdminError> {
        all_consuming(preceded(opt(tag("projects/")), project_id))(input.trim())
            .map(|(_, project)| Self {
                project: project.to_string(),
            })
            .map_err(|_| AdminError::InvalidName {
                name: input.to_string(),
                expected: "projects/<project>",
            })
    }

    pub fn instance_config(
        &self,
        config: &str,
    ) -> InstanceConfigName {
        InstanceConfigName {
            project: self.clone(),
            config: config.to_string(),
        }
    }
}

impl std::fmt::Display for ProjectName {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "projects/{}", self.project)
    }
}

impl InstanceConfigName {
    pub fn is_custom(&self) -> bool {
        self.config.starts_with(CUSTOM_CONFIG_PREFIX)
    }
}

impl std::fmt::Display for InstanceConfigName {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}/instanceConfigs/{}", self.project, self.config)
    }
}

/// Checks a bare config id (no slashes, non-empty).
pub fn is_valid_config_id(id: &str) -> bool {
    all_consuming(config_id)(id).is_ok()
}

fn project_id(input: &str) -> IResult<&str, &str> {
    take_while1(|ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':'))(
        input,
    )
}

fn config_id(input: &str) -> IResult<&str, &str> {
    take_while1(|ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))(input)
}
