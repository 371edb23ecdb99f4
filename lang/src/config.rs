use std::fmt;

/// Engine subsystems that can emit debug traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDomain {
    Eval,
    Read,
    Expand,
}

impl LogDomain {
    pub const ALL: [LogDomain; 3] = [LogDomain::Eval, LogDomain::Read, LogDomain::Expand];

    pub fn name(self) -> &'static str {
        match self {
            LogDomain::Eval => "eval",
            LogDomain::Read => "read",
            LogDomain::Expand => "expand",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eval" => Some(LogDomain::Eval),
            "read" => Some(LogDomain::Read),
            "expand" => Some(LogDomain::Expand),
            _ => None,
        }
    }
}

/// Which domains are currently traced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogDomains {
    eval: bool,
    read: bool,
    expand: bool,
}

impl LogDomains {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            eval: true,
            read: true,
            expand: true,
        }
    }

    /// Parse a comma separated list such as `eval,expand`. `all` and `none`
    /// are accepted as shorthands.
    pub fn parse(list: &str) -> Result<Self, String> {
        let mut domains = Self::none();
        for part in list.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            match part {
                "all" => domains = Self::all(),
                "none" => domains = Self::none(),
                name => match LogDomain::from_name(name) {
                    Some(domain) => domains.set(domain, true),
                    None => return Err(format!("unknown log domain '{name}'")),
                },
            }
        }
        Ok(domains)
    }

    pub fn is_enabled(&self, domain: LogDomain) -> bool {
        match domain {
            LogDomain::Eval => self.eval,
            LogDomain::Read => self.read,
            LogDomain::Expand => self.expand,
        }
    }

    pub fn set(&mut self, domain: LogDomain, enabled: bool) {
        match domain {
            LogDomain::Eval => self.eval = enabled,
            LogDomain::Read => self.read = enabled,
            LogDomain::Expand => self.expand = enabled,
        }
    }

    pub fn any(&self) -> bool {
        self.eval || self.read || self.expand
    }
}

impl fmt::Display for LogDomains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled: Vec<&str> = LogDomain::ALL
            .iter()
            .filter(|domain| self.is_enabled(**domain))
            .map(|domain| domain.name())
            .collect();
        if enabled.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", enabled.join(","))
        }
    }
}

/// Settings fixed when an interpreter is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub load_stdlib: bool,
    pub log: LogDomains,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            load_stdlib: true,
            log: LogDomains::none(),
        }
    }
}

impl InterpreterConfig {
    pub fn with_stdlib(mut self, load_stdlib: bool) -> Self {
        self.load_stdlib = load_stdlib;
        self
    }

    pub fn with_log(mut self, log: LogDomains) -> Self {
        self.log = log;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_domain_list() {
        let domains = LogDomains::parse("eval, expand").unwrap();
        assert!(domains.is_enabled(LogDomain::Eval));
        assert!(!domains.is_enabled(LogDomain::Read));
        assert!(domains.is_enabled(LogDomain::Expand));
        assert_eq!(domains.to_string(), "eval,expand");
    }

    #[test]
    fn parse_shorthands() {
        assert_eq!(LogDomains::parse("all").unwrap(), LogDomains::all());
        assert_eq!(LogDomains::parse("all,none").unwrap(), LogDomains::none());
        assert_eq!(LogDomains::parse("").unwrap().to_string(), "none");
    }

    #[test]
    fn parse_rejects_unknown_domain() {
        assert_eq!(
            LogDomains::parse("eval,gc"),
            Err("unknown log domain 'gc'".to_string())
        );
    }

    #[test]
    fn default_config_loads_stdlib_quietly() {
        let config = InterpreterConfig::default();
        assert!(config.load_stdlib);
        assert!(!config.log.any());
        assert!(!config.with_stdlib(false).load_stdlib);
    }
}
