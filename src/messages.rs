//! Operator-facing messages
//!
//! Validation messages double as the lookup keys for text-based error
//! classification, so their wording is part of the telemetry contract.

/// Messages shown while submitting a run
pub mod user {
    /// Appended to the remote service's build message
    pub const BUILD_CREATED: &str = "Build created";
    /// Prefix for the dashboard link
    pub const VISIT_DASHBOARD: &str = "Visit the dashboard for test reporting:";
    /// Hint printed when the run is not synchronous; `<build-id>` is replaced
    pub const EXIT_SYNC_CLI_MESSAGE: &str =
        "Exiting the CLI, but your build is still running. Check its status later with build id <build-id>.";
    /// Warning when no parallelism is configured anywhere
    pub const NO_PARALLELS: &str =
        "Using the default parallelism as no parallels were specified in the config file or on the command line";
    /// Warning when the dependency map is declared but empty
    pub const NO_DEPENDENCIES: &str =
        "No dependencies were specified; the remote run will only have the framework's default packages installed";
    /// Follow-up pointer for [`NO_DEPENDENCIES`]
    pub const NO_DEPENDENCIES_READ_MORE: &str =
        "Read more about installing dependencies at https://docs.testship.dev/dependencies";
    /// Shown after the artifact upload fails
    pub const ZIP_UPLOAD_FAILED: &str = "Zip upload failed";
    /// Shown after archiving fails
    pub const FAILED_TO_ZIP: &str = "Failed to zip files";
    /// Shown when the partial archive cannot be removed
    pub const ZIP_DELETE_FAILED: &str = "Could not delete the local archive";
    /// Shown when a synchronous build passes
    pub const BUILD_PASSED: &str = "All tests passed";
    /// Shown when a synchronous build has failing tests
    pub const BUILD_FAILED: &str = "Some tests failed";
    /// Shown when a synchronous build ends in an infrastructure error
    pub const BUILD_ERRORED: &str = "The build did not complete";
    /// Shown when polling is interrupted by the user
    pub const POLL_INTERRUPTED: &str =
        "Stopped waiting for the build; it keeps running remotely";
}

/// Messages produced while validating a configuration
pub mod validation {
    /// Generic note appended to every validation failure
    pub const NOT_VALID: &str = "testship.json is not valid";
    /// Configuration has no content
    pub const EMPTY_CONFIG: &str = "testship.json is empty";
    /// Username or access key missing
    pub const INCORRECT_AUTH_PARAMS: &str =
        "Incorrect auth params: username and access key are required";
    /// Placeholder credentials from `testship init` left in place
    pub const INVALID_DEFAULT_AUTH_PARAMS: &str =
        "Your username and access key still hold the placeholder values from testship init";
    /// No browsers configured
    pub const EMPTY_BROWSER_LIST: &str = "Browser list is empty";
    /// `run_settings` section missing
    pub const EMPTY_RUN_SETTINGS: &str = "Empty run settings";
    /// `run_settings.project_dir` missing
    pub const EMPTY_PROJECT_DIR: &str = "project_dir is not set in run_settings";
    /// Parallels not a supported value
    pub const INVALID_PARALLELS_CONFIGURATION: &str =
        "Invalid value specified for parallels to use. Maximum parallels to use should be a number greater than 0, or -1 for the maximum available";
    /// `base_url` is local but no tunnel is configured
    pub const LOCAL_NOT_SET: &str =
        "To test a base_url on localhost, set local to true in connection_settings";
    /// Project dir does not exist or is not a directory
    pub const INCORRECT_DIRECTORY_STRUCTURE: &str =
        "project_dir does not point at a directory; check the path in run_settings";
    /// No spec files matched
    pub const NO_SPEC_FILES: &str = "No spec files matched the configured spec patterns";
    /// Suffix used for framework config problems
    pub const FRAMEWORK_CONFIG_HINT: &str =
        "Please use --framework-config <path to framework config>.";
}

/// Placeholder values written by `testship init`
pub mod placeholders {
    /// Username placeholder
    pub const USERNAME: &str = "<Your testship username>";
    /// Access key placeholder
    pub const ACCESS_KEY: &str = "<Your testship access key>";
    /// Parallels placeholder
    pub const PARALLELS: &str = "Here goes the number of parallels you want to run";
}
