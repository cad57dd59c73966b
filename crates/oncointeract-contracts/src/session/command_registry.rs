#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is one free-text value.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "receptor",
        action: "set_receptor",
    },
    CommandSpec {
        command: "cancer_type",
        action: "set_cancer_type",
    },
    CommandSpec {
        command: "cancer_class",
        action: "set_cancer_class",
    },
    CommandSpec {
        command: "mutation",
        action: "set_mutation",
    },
    CommandSpec {
        command: "text_model",
        action: "set_text_model",
    },
    CommandSpec {
        command: "image_model",
        action: "set_image_model",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "ligand",
        action: "load_ligand",
    },
    CommandSpec {
        command: "receptor_file",
        action: "load_custom_receptor",
    },
    CommandSpec {
        command: "experimental",
        action: "load_experimental",
    },
    CommandSpec {
        command: "export",
        action: "export_report",
    },
    CommandSpec {
        command: "html",
        action: "export_html",
    },
    CommandSpec {
        command: "save_images",
        action: "save_images",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "form",
        action: "show_form",
    },
    CommandSpec {
        command: "clear_experimental",
        action: "clear_experimental",
    },
    CommandSpec {
        command: "submit",
        action: "submit",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "wait",
        action: "wait",
    },
    CommandSpec {
        command: "show",
        action: "show_report",
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
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/ligand <path>",
    "/receptor <key|label>",
    "/receptor_file <path>",
    "/cancer_type <key|label>",
    "/cancer_class <key|label>",
    "/mutation [text]",
    "/experimental <path>",
    "/clear_experimental",
    "/form",
    "/submit",
    "/status",
    "/wait",
    "/show",
    "/reset",
    "/export [path]",
    "/save_images [dir]",
    "/html [path]",
    "/text_model <name>",
    "/image_model <name>",
    "/quit",
];
