use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Lower an expression into a backend filter
    Compile {
        /// Target backend: "postgres", "mysql", "sqlite", "oracle" or "ldap"
        #[arg(long)]
        backend: String,

        #[arg(long, help = "JSON expression tree file")]
        expr: String,

        #[arg(long, help = "Compiler settings file (JSON)")]
        settings: Option<String>,

        #[arg(long, help = "Write literals into the filter instead of binding them")]
        inline: bool,

        #[arg(long, help = "JSON object of named values resolvable by the expression")]
        resolvables: Option<String>,

        #[arg(long, help = "Print the filter, parameters and postprocessors as JSON")]
        json: bool,
    },
    /// Evaluate an expression in-process
    Eval {
        #[arg(long, help = "JSON expression tree file")]
        expr: String,

        #[arg(long, help = "JSON object bound to the object prefix")]
        object: Option<String>,

        #[arg(long, help = "JSON object of named values resolvable by the expression")]
        resolvables: Option<String>,

        #[arg(long, help = "Compiler settings file (JSON)")]
        settings: Option<String>,
    },
    /// Run an expression against a datasource and print the matching objects
    Query {
        #[arg(long, help = "JSON expression tree file")]
        expr: String,

        /// SQLite connection URL, e.g. "sqlite://people.db"
        #[arg(long, requires = "table", conflicts_with = "directory")]
        sqlite: Option<String>,

        #[arg(long, help = "Table queried through the SQLite URL")]
        table: Option<String>,

        #[arg(long, help = "JSON array of directory entries")]
        directory: Option<String>,

        #[arg(long, help = "Lower concatenation as nested concat() calls on SQLite")]
        concat_function: bool,

        #[arg(long, value_delimiter = ',', help = "Attributes to return, all when omitted")]
        attributes: Vec<String>,

        #[arg(long, help = "Compiler settings file (JSON)")]
        settings: Option<String>,
    },
    /// List the registered functions
    Functions,
}
