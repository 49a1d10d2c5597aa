#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const TEXT_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "ask",
        action: "ask",
    },
    CommandSpec {
        command: "lang",
        action: "set_language",
    },
];

pub(crate) const MULTI_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "add",
    action: "add_images",
}];

pub(crate) const INDEX_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "remove",
        action: "remove_image",
    },
    CommandSpec {
        command: "close",
        action: "close_overlay",
    },
    CommandSpec {
        command: "illustrate",
        action: "illustrate",
    },
    CommandSpec {
        command: "stages",
        action: "show_stages",
    },
    CommandSpec {
        command: "consult",
        action: "consult",
    },
];

pub(crate) const INDEX_TEXT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "recipe",
        action: "open_recipe",
    },
    CommandSpec {
        command: "decorate",
        action: "open_decoration",
    },
    CommandSpec {
        command: "tab",
        action: "set_tab",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "analyze",
        action: "analyze",
    },
    CommandSpec {
        command: "plants",
        action: "show_plants",
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

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/add <paths…>",
    "/remove <n>",
    "/analyze",
    "/lang <code>",
    "/plants",
    "/tab <n> <info|care|uses|health|market>",
    "/recipe <n> <dish>",
    "/decorate <n> <style>",
    "/close <n>",
    "/illustrate <n>",
    "/stages <n>",
    "/consult <n>",
    "/ask <text>",
    "/reset",
    "/help",
    "/quit",
];
