pub const TARGET_SCHEMA: &str = "public";
pub const TARGET_TABLE: &str = "user_events";

/// A static index definition that provisioning makes sure exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: &'static str,
    /// `CREATE INDEX IF NOT EXISTS <name> ...` statement
    pub definition: &'static str,
    pub description: &'static str,
}

impl IndexDescriptor {
    /// Name embedded in the creation statement, if it can be found
    pub fn embedded_name(&self) -> Option<&'static str> {
        embedded_index_name(self.definition)
    }
}

pub const USER_EVENTS_INDEXES: [IndexDescriptor; 5] = [
    IndexDescriptor {
        name: "idx_user_events_event_type",
        definition: "CREATE INDEX IF NOT EXISTS idx_user_events_event_type \
                     ON public.user_events(event_type) \
                     WHERE event_type IS NOT NULL AND event_type != ''",
        description: "event_type lookups (event type listing)",
    },
    IndexDescriptor {
        name: "idx_user_events_advertiser",
        definition: "CREATE INDEX IF NOT EXISTS idx_user_events_advertiser \
                     ON public.user_events(advertiser) \
                     WHERE advertiser IS NOT NULL AND advertiser != ''",
        description: "advertiser lookups (category listing)",
    },
    IndexDescriptor {
        name: "idx_user_events_external_user_id",
        definition: "CREATE INDEX IF NOT EXISTS idx_user_events_external_user_id \
                     ON public.user_events(external_user_id) \
                     WHERE external_user_id IS NOT NULL",
        description: "external_user_id filter of the export query",
    },
    IndexDescriptor {
        name: "idx_user_events_ua_ip",
        definition: "CREATE INDEX IF NOT EXISTS idx_user_events_ua_ip \
                     ON public.user_events(user_agent, ip_address) \
                     WHERE user_agent IS NOT NULL AND user_agent != '' \
                     AND ip_address IS NOT NULL AND ip_address != ''",
        description: "composite user_agent + ip_address for distinct pair scans",
    },
    IndexDescriptor {
        name: "idx_user_events_event_date",
        definition: "CREATE INDEX IF NOT EXISTS idx_user_events_event_date \
                     ON public.user_events(event_date)",
        description: "event_date range filters",
    },
];

/// Extract the index name from a `CREATE [UNIQUE] INDEX IF NOT EXISTS <name>` statement
pub fn embedded_index_name(definition: &str) -> Option<&str> {
    const MARKER: &str = "IF NOT EXISTS";

    // ASCII uppercasing keeps byte offsets aligned with `definition`
    let upper = definition.to_ascii_uppercase();
    let start = upper.find(MARKER)? + MARKER.len();
    let rest = definition[start..].trim_start();
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    let name = &rest[..end];

    if name.is_empty() || name.eq_ignore_ascii_case("ON") {
        None
    } else {
        Some(name)
    }
}
