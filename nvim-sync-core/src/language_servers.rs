//! Language server detection by identifier containment.

/// `nvim-lspconfig` server names looked for when no catalog is configured.
pub const DEFAULT_LANGUAGE_SERVERS: &[&str] = &[
    "angularls",
    "ansiblels",
    "astro",
    "bashls",
    "clangd",
    "clojure_lsp",
    "cmake",
    "cssls",
    "denols",
    "dockerls",
    "elixirls",
    "emmet_ls",
    "eslint",
    "fennel_ls",
    "gopls",
    "graphql",
    "hls",
    "intelephense",
    "jdtls",
    "jsonls",
    "julials",
    "kotlin_language_server",
    "lua_ls",
    "marksman",
    "nil_ls",
    "ocamllsp",
    "omnisharp",
    "prismals",
    "pylsp",
    "pyright",
    "r_language_server",
    "rnix",
    "ruff_lsp",
    "rust_analyzer",
    "solargraph",
    "sqlls",
    "sumneko_lua",
    "svelte",
    "tailwindcss",
    "taplo",
    "terraformls",
    "texlab",
    "ts_ls",
    "tsserver",
    "vimls",
    "volar",
    "yamlls",
    "zls",
];

#[derive(Debug, Clone)]
pub struct LanguageServerExtractor {
    catalog: Vec<String>,
}

impl Default for LanguageServerExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE_SERVERS.iter().map(|s| s.to_string()).collect())
    }
}

impl LanguageServerExtractor {
    pub fn new(catalog: Vec<String>) -> Self {
        LanguageServerExtractor { catalog }
    }

    /// Catalog entries contained in `content`, in catalog order.
    pub fn extract(&self, content: &str) -> Vec<&str> {
        self.catalog
            .iter()
            .filter(|server| content.contains(server.as_str()))
            .map(String::as_str)
            .collect()
    }
}
