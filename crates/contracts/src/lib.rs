//! The token contract deployed by the service together with the logic to
//! compile it into deployable artifacts.

use {
    alloy::{
        dyn_abi::{DynSolValue, JsonAbiExt},
        json_abi::JsonAbi,
        primitives::Bytes,
    },
    foundry_compilers::{
        artifacts::{Source, Sources},
        compilers::{
            Compiler,
            CompilerInput,
            solc::{SolcCompiler, SolcLanguage, SolcVersionedInput},
        },
        solc::Solc,
    },
    semver::Version,
    std::collections::BTreeMap,
};

/// Solidity source of the token.
pub const SOURCE: &str = include_str!("GBTToken.sol");

/// Name of the contract inside [`SOURCE`].
pub const CONTRACT_NAME: &str = "GBTToken";

/// File name the source is compiled under.
const SOURCE_FILE: &str = "GBTToken.sol";

/// Compiler version the source is pinned to by default.
pub const DEFAULT_SOLC_VERSION: Version = Version::new(0, 8, 21);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("solc toolchain unavailable: {0}")]
    Toolchain(String),
    #[error("compilation failed:\n{0}")]
    Compilation(String),
    #[error("compiler output has no {0} for {CONTRACT_NAME}")]
    MissingArtifact(&'static str),
    #[error("contract has no constructor")]
    MissingConstructor,
    #[error("failed to encode constructor arguments: {0}")]
    Encoding(#[from] alloy::dyn_abi::Error),
}

/// ABI and creation bytecode of the compiled token.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl CompiledContract {
    /// Returns the contract creation payload: the bytecode followed by the
    /// ABI encoded constructor arguments.
    pub fn deployment_code(&self, constructor_args: &[DynSolValue]) -> Result<Bytes, Error> {
        let constructor = self.abi.constructor().ok_or(Error::MissingConstructor)?;
        let args = constructor.abi_encode_input(constructor_args)?;

        let mut code = Vec::with_capacity(self.bytecode.len() + args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(&args);
        Ok(code.into())
    }
}

/// Compiles [`SOURCE`] with the given solc version, installing the compiler
/// first if it is not available locally.
pub fn compile(version: &Version) -> Result<CompiledContract, Error> {
    tracing::info!(%version, "compiling {CONTRACT_NAME}");
    let solc = Solc::find_or_install(version).map_err(|err| Error::Toolchain(err.to_string()))?;

    let input = compiler_input(version);
    let output = SolcCompiler::Specific(solc)
        .compile(&input)
        .map_err(|err| Error::Toolchain(err.to_string()))?;

    let errors = output
        .errors
        .iter()
        .filter(|diagnostic| diagnostic.is_error())
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        return Err(Error::Compilation(errors.join("\n")));
    }

    let contract = output
        .contracts
        .values()
        .find_map(|contracts| contracts.get(CONTRACT_NAME))
        .ok_or(Error::MissingArtifact("artifact"))?;
    let abi = contract.abi.clone().ok_or(Error::MissingArtifact("abi"))?;
    let bytecode = contract
        .evm
        .as_ref()
        .and_then(|evm| evm.bytecode.as_ref())
        .and_then(|bytecode| bytecode.object.as_bytes())
        .cloned()
        .ok_or(Error::MissingArtifact("bytecode"))?;

    tracing::info!(bytecode_len = bytecode.len(), "compiled {CONTRACT_NAME}");
    Ok(CompiledContract { abi, bytecode })
}

/// Standard JSON input compiling [`SOURCE`] with default settings.
fn compiler_input(version: &Version) -> SolcVersionedInput {
    SolcVersionedInput::build(
        Sources(BTreeMap::from([(SOURCE_FILE.into(), Source::new(SOURCE))])),
        Default::default(),
        SolcLanguage::Solidity,
        version.clone(),
    )
}
