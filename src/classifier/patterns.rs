//! Built-in classification pattern tables.
//!
//! Glob syntax: `**` crosses path segments, `*` stays within one segment,
//! matching is case-sensitive. Patterns without a `/` also match against
//! the basename of a nested path.

/// Files never worth analyzing: binaries, generated output, lockfiles.
pub(super) const IGNORE_PATTERNS: &[&str] = &[
    // Dependency and build output trees
    "node_modules/**",
    "**/node_modules/**",
    "dist/**",
    "**/dist/**",
    "build/**",
    "**/build/**",
    "target/**",
    "**/target/**",
    "vendor/**",
    "**/vendor/**",
    ".git/**",
    "**/.git/**",
    "**/__pycache__/**",
    "coverage/**",
    "**/coverage/**",
    ".next/**",
    "**/.next/**",
    // Generated artifacts
    "*.min.js",
    "*.min.css",
    "*.map",
    "*.pyc",
    "*.class",
    "*.o",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.exe",
    "*.wasm",
    "*.bin",
    // Media and fonts
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.svg",
    "*.ico",
    "*.webp",
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.eot",
    "*.otf",
    "*.mp3",
    "*.mp4",
    "*.webm",
    "*.avi",
    "*.mov",
    // Archives and documents
    "*.pdf",
    "*.zip",
    "*.tar",
    "*.gz",
    "*.rar",
    "*.7z",
    // Lockfiles
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "composer.lock",
    "Gemfile.lock",
    "poetry.lock",
    "*.lock",
    // Noise
    "*.log",
    ".DS_Store",
    "Thumbs.db",
];

/// Priority 1: security-critical surfaces.
pub(super) const TIER1_PATTERNS: &[&str] = &[
    // Environment and credential files
    ".env",
    ".env.*",
    "*.env",
    "*.pem",
    "*.key",
    "*.crt",
    "*secret*",
    "*credential*",
    "*password*",
    ".npmrc",
    ".htpasswd",
    "id_rsa*",
    // Authentication and authorization code
    "**/auth/**",
    "**/auth*/**",
    "**/security/**",
    "**/secrets/**",
    "**/crypto/**",
    "**/login/**",
    "**/oauth/**",
    "**/session/**",
    "**/sessions/**",
    // Money paths
    "**/payment/**",
    "**/payments/**",
    "**/billing/**",
    "**/checkout/**",
    // Deployment surface
    "Dockerfile",
    "Dockerfile.*",
    "docker-compose*",
    "*.tf",
];

/// Priority 2: core business logic.
pub(super) const TIER2_PATTERNS: &[&str] = &[
    "src/**",
    "lib/**",
    "app/**",
    "server/**",
    "backend/**",
    "core/**",
    "**/api/**",
    "**/services/**",
    "**/service/**",
    "**/models/**",
    "**/model/**",
    "**/controllers/**",
    "**/handlers/**",
    "**/routes/**",
    "**/middleware/**",
    "**/db/**",
    "**/database/**",
    "**/domain/**",
    "**/store/**",
    "**/stores/**",
    "**/graphql/**",
    "**/queries/**",
    // Entry points
    "main.*",
    "index.*",
    "server.*",
];

/// Priority 3: supporting code, configuration, and documentation.
pub(super) const TIER3_PATTERNS: &[&str] = &[
    // Documentation
    "*.md",
    "*.mdx",
    "*.txt",
    "*.rst",
    "docs/**",
    "**/docs/**",
    // Configuration
    "*.json",
    "*.yaml",
    "*.yml",
    "*.toml",
    "*.ini",
    "*.cfg",
    "*.conf",
    "*.xml",
    // Tests
    "**/tests/**",
    "**/test/**",
    "**/__tests__/**",
    "**/spec/**",
    "*.test.*",
    "*.spec.*",
    // Styling and markup
    "*.css",
    "*.scss",
    "*.less",
    "*.html",
    // Source files not captured by a core-logic directory
    "**/*.ts",
    "**/*.tsx",
    "**/*.js",
    "**/*.jsx",
    "**/*.py",
    "**/*.rb",
    "**/*.go",
    "**/*.rs",
    "**/*.java",
    "**/*.kt",
    "**/*.c",
    "**/*.cpp",
    "**/*.h",
    "**/*.cs",
    "**/*.php",
    "**/*.swift",
    "**/*.sh",
    "**/*.sql",
    "**/*.vue",
    "**/*.svelte",
];
