//! One `sol!` block for the whole surface so the shared structs (operator sets,
//! curve points, certificates) are a single type family across interfaces.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct OperatorSet {
        address avs;
        uint32 id;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254G1Point {
        uint256 x;
        uint256 y;
    }

    /// G2 coordinates in precompile order: `x = [x.c1, x.c0]`, `y = [y.c1, y.c0]`.
    #[derive(Debug, PartialEq, Eq)]
    struct BN254G2Point {
        uint256[2] x;
        uint256[2] y;
    }

    /// One operator's table entry: G1 public key plus per-strategy weights.
    #[derive(Debug, PartialEq, Eq)]
    struct BN254OperatorInfo {
        BN254G1Point pubkey;
        uint256[] weights;
    }

    /// Aggregate info for a whole operator set, as stored by the table updater.
    #[derive(Debug, PartialEq, Eq)]
    struct BN254OperatorSetInfo {
        bytes32 operatorInfoTreeRoot;
        uint256 numOperators;
        BN254G1Point aggregatePubkey;
        uint256[] totalWeights;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254NonSignerWitness {
        uint32 operatorIndex;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BN254Certificate {
        uint32 referenceTimestamp;
        bytes32 messageHash;
        BN254G1Point signature;
        BN254G2Point apk;
        BN254NonSignerWitness[] nonSignerWitnesses;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ECDSACertificate {
        uint32 referenceTimestamp;
        bytes32 messageHash;
        bytes sig;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ExecutorOperatorSetTaskConfig {
        address certificateVerifier;
        uint8 curveType;
        uint96 taskSLA;
    }

    // Conflict classes absorbed by callers; decoded by selector when the node
    // returns structured revert data.
    error TableUpdateForPastTimestamp();
    error GlobalTableRootStale();
    error KeyAlreadyRegistered();
    error InvalidOperatorSet();

    #[derive(Debug, PartialEq, Eq)]
    interface IKeyRegistrar {
        function configureOperatorSet(OperatorSet operatorSet, uint8 curveType) external;

        function registerKey(
            address operator,
            OperatorSet operatorSet,
            bytes keyData,
            bytes signature
        ) external;

        function isRegistered(OperatorSet operatorSet, address operator) external view returns (bool);

        function getBN254KeyRegistrationMessageHash(
            address operator,
            OperatorSet operatorSet,
            bytes keyData
        ) external view returns (bytes32);

        function getECDSAKeyRegistrationMessageHash(
            address operator,
            OperatorSet operatorSet,
            bytes keyData
        ) external view returns (bytes32);

        function encodeBN254KeyData(
            BN254G1Point g1Point,
            BN254G2Point g2Point
        ) external view returns (bytes);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface ICrossChainRegistry {
        function getSupportedChains() external view returns (uint256[] chainIds, address[] tableUpdaters);

        function getActiveGenerationReservations() external view returns (OperatorSet[] operatorSets);

        function getOperatorTableCalculator(OperatorSet operatorSet) external view returns (address);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IOperatorTableCalculator {
        function calculateOperatorTableBytes(OperatorSet operatorSet) external view returns (bytes);

        function calculateOperatorInfoLeafHash(BN254OperatorInfo operatorInfo) external view returns (bytes32);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IOperatorTableUpdater {
        function getGenerator() external view returns (OperatorSet generator);

        function updateGenerator(OperatorSet generator, BN254OperatorSetInfo generatorInfo) external;

        function confirmGlobalTableRoot(
            BN254Certificate globalRootCert,
            bytes32 globalTableRoot,
            uint32 referenceTimestamp,
            uint32 referenceBlockNumber
        ) external;

        function updateOperatorTable(
            uint32 referenceTimestamp,
            bytes32 globalTableRoot,
            uint32 operatorSetIndex,
            bytes32[] proof,
            bytes operatorTableBytes
        ) external;

        function getLatestReferenceTimestamp() external view returns (uint32);

        function getReferenceBlockNumberByTimestamp(uint32 referenceTimestamp) external view returns (uint32);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IBN254CertificateVerifier {
        function calculateCertificateDigest(
            uint32 referenceTimestamp,
            bytes32 messageHash
        ) external view returns (bytes32);

        function verifyCertificateProportion(
            OperatorSet operatorSet,
            BN254Certificate cert,
            uint16[] totalStakeProportionThresholds
        ) external view returns (bool satisfied, address[] nonSigners);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IECDSACertificateVerifier {
        function calculateCertificateDigest(
            uint32 referenceTimestamp,
            bytes32 messageHash
        ) external view returns (bytes32);

        function verifyCertificateProportion(
            OperatorSet operatorSet,
            ECDSACertificate cert,
            uint16[] totalStakeProportionThresholds
        ) external view returns (bool satisfied, address[] nonSigners);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface ITaskMailbox {
        function getBN254CertificateBytes(BN254Certificate cert) external view returns (bytes);

        function getECDSACertificateBytes(ECDSACertificate cert) external view returns (bytes);

        function submitResult(bytes32 taskId, bytes cert, bytes result) external;

        function getExecutorOperatorSetTaskConfig(
            OperatorSet operatorSet
        ) external view returns (ExecutorOperatorSetTaskConfig);
    }
}
