#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "poster",
        action: "set_poster",
    },
    CommandSpec {
        command: "download",
        action: "download",
    },
];

pub(crate) const MULTI_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "person",
    action: "add_persons",
}];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "remove",
        action: "remove_person",
    },
    CommandSpec {
        command: "key",
        action: "select_key",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "clear_poster",
        action: "clear_poster",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "dismiss",
        action: "dismiss_error",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
];

pub const STUDIO_HELP_COMMANDS: &[&str] = &[
    "/poster <path>",
    "/person <path>...",
    "/remove <id>",
    "/clear_poster",
    "/key [api-key]",
    "/generate",
    "/download [path]",
    "/status",
    "/dismiss",
    "/reset",
    "/quit",
];
