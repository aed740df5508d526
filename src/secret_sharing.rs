//! Shamir sharing over the access tree and recovery through Lagrange interpolation in the
//! exponent.
use ark_ff::{Field, One, Zero};
use rand::Rng;
use tracing::trace;

use crate::abe_attribute::AbeAttribute;
use crate::access_tree::{AccessTree, ROOT};
use crate::access_tree_node::AccessTreeNode;
use crate::group::{random_scalar, Fr, Gt};

/// Polynomial over `Fr`, lowest degree coefficient first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coefficients: Vec<Fr>,
}

impl Polynomial {
    /// Random polynomial of the given degree with a fixed constant term.
    pub fn random<R: Rng + ?Sized>(degree: usize, constant: Fr, rng: &mut R) -> Polynomial {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(constant);
        coefficients.extend((0..degree).map(|_| random_scalar(rng)));
        Polynomial { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn evaluate(&self, x: Fr) -> Fr {
        self.coefficients
            .iter()
            .rev()
            .fold(Fr::zero(), |acc, coefficient| acc * x + coefficient)
    }
}

impl From<Vec<Fr>> for Polynomial {
    fn from(mut coefficients: Vec<Fr>) -> Self {
        if coefficients.is_empty() {
            coefficients.push(Fr::zero());
        }
        Polynomial { coefficients }
    }
}

/// Lagrange basis coefficient `Δ_{i,S}(x) = Π_{j ∈ S, j ≠ i} (x - j) / (i - j)`.
///
/// Returns `None` if `i` is not in `set`.
pub fn lagrange_coefficient(i: usize, set: &[usize], x: Fr) -> Option<Fr> {
    if !set.contains(&i) {
        return None;
    }

    let i_fr = Fr::from(i as u64);
    let mut numerator = Fr::one();
    let mut denominator = Fr::one();
    for &j in set.iter().filter(|&&j| j != i) {
        let j_fr = Fr::from(j as u64);
        numerator *= x - j_fr;
        denominator *= i_fr - j_fr;
    }
    denominator.inverse().map(|inverse| numerator * inverse)
}

/// Interpolates `f(0)` from the points `(i, f(i))`.
pub fn interpolate_at_zero(points: &[(usize, Fr)]) -> Option<Fr> {
    let set: Vec<usize> = points.iter().map(|(i, _)| *i).collect();
    points.iter().try_fold(Fr::zero(), |acc, (i, y)| {
        lagrange_coefficient(*i, &set, Fr::zero()).map(|coefficient| acc + coefficient * y)
    })
}

/// Shares `secret` down the tree. Each gate gets a random polynomial of degree
/// `threshold - 1` whose constant term is the gate's own share, and child `c` receives
/// the evaluation at `c`. Returns the share of every node, indexed like the tree.
pub fn distribute_shares<R: Rng + ?Sized>(tree: &AccessTree, secret: Fr, rng: &mut R) -> Vec<Fr> {
    let mut shares = vec![Fr::zero(); tree.len()];
    share_node(tree.nodes(), ROOT, secret, &mut shares, rng);
    shares
}

fn share_node<R: Rng + ?Sized>(
    nodes: &[AccessTreeNode],
    index: usize,
    share: Fr,
    shares: &mut [Fr],
    rng: &mut R,
) {
    shares[index] = share;
    if let AccessTreeNode::Gate {
        threshold,
        children,
    } = &nodes[index]
    {
        let polynomial = Polynomial::random(threshold - 1, share, rng);
        for &child in children {
            let child_share = polynomial.evaluate(Fr::from(child as u64));
            share_node(nodes, child, child_share, shares, rng);
        }
    }
}

/// Recovers `base^secret` from leaf values `base^{share(leaf)}`.
///
/// `leaf_value` returns `None` for leaves that cannot contribute. A gate combines the
/// first `threshold` satisfiable children in child order and ignores the rest. Returns
/// `None` if the root is not satisfiable.
pub fn recover_secret<F>(tree: &AccessTree, leaf_value: F) -> Option<Gt>
where
    F: Fn(usize, AbeAttribute) -> Option<Gt>,
{
    recover_node(tree.nodes(), ROOT, &leaf_value)
}

fn recover_node<F>(nodes: &[AccessTreeNode], index: usize, leaf_value: &F) -> Option<Gt>
where
    F: Fn(usize, AbeAttribute) -> Option<Gt>,
{
    match &nodes[index] {
        AccessTreeNode::Leaf { attribute } => leaf_value(index, *attribute),
        AccessTreeNode::Gate {
            threshold,
            children,
        } => {
            let mut satisfied = Vec::with_capacity(*threshold);
            for &child in children {
                match recover_node(nodes, child, leaf_value) {
                    Some(value) => {
                        trace!(node = index, child, "child satisfied");
                        satisfied.push((child, value));
                        if satisfied.len() == *threshold {
                            break;
                        }
                    }
                    None => trace!(node = index, child, "child not satisfied"),
                }
            }
            if satisfied.len() < *threshold {
                return None;
            }

            let set: Vec<usize> = satisfied.iter().map(|(child, _)| *child).collect();
            satisfied
                .iter()
                .try_fold(Gt::one(), |acc, (child, value)| {
                    lagrange_coefficient(*child, &set, Fr::zero())
                        .map(|coefficient| acc * value.pow(coefficient))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::access_tree::Satisfiable;
    use crate::group::{pairing, random_g1, random_g2};

    fn demo_tree() -> AccessTree {
        AccessTree::from_policy("2 of (1, 2 of (2, 3, 4), 5)").unwrap()
    }

    #[test]
    fn test_polynomial_evaluate() {
        // 3 + 2x + x^2
        let polynomial = Polynomial::from(vec![Fr::from(3u64), Fr::from(2u64), Fr::from(1u64)]);

        assert_eq!(polynomial.degree(), 2);
        assert_eq!(polynomial.evaluate(Fr::zero()), Fr::from(3u64));
        assert_eq!(polynomial.evaluate(Fr::from(2u64)), Fr::from(11u64));
    }

    #[test]
    fn test_random_polynomial_keeps_constant() {
        let rng = &mut ChaCha20Rng::seed_from_u64(0);
        let secret = random_scalar(rng);
        let polynomial = Polynomial::random(4, secret, rng);

        assert_eq!(polynomial.degree(), 4);
        assert_eq!(polynomial.evaluate(Fr::zero()), secret);
    }

    #[test]
    fn test_lagrange_coefficient() {
        // for S = {1, 2}: Δ_1(0) = 2, Δ_2(0) = -1
        assert_eq!(lagrange_coefficient(1, &[1, 2], Fr::zero()), Some(Fr::from(2u64)));
        assert_eq!(lagrange_coefficient(2, &[1, 2], Fr::zero()), Some(-Fr::one()));
        assert_eq!(lagrange_coefficient(3, &[1, 2], Fr::zero()), None);
        assert_eq!(lagrange_coefficient(4, &[4], Fr::zero()), Some(Fr::one()));
    }

    #[test]
    fn test_interpolate_any_threshold_subset() {
        let rng = &mut ChaCha20Rng::seed_from_u64(1);
        let secret = random_scalar(rng);
        let polynomial = Polynomial::random(2, secret, rng);
        let point = |i: usize| (i, polynomial.evaluate(Fr::from(i as u64)));

        assert_eq!(interpolate_at_zero(&[point(1), point(2), point(3)]), Some(secret));
        assert_eq!(interpolate_at_zero(&[point(5), point(2), point(7)]), Some(secret));
        assert_ne!(interpolate_at_zero(&[point(1), point(2)]), Some(secret));
    }

    #[test]
    fn test_distribute_shares_consistent() {
        let rng = &mut ChaCha20Rng::seed_from_u64(2);
        let tree = demo_tree();
        let secret = random_scalar(rng);
        let shares = distribute_shares(&tree, secret, rng);

        assert_eq!(shares.len(), tree.len());
        assert_eq!(shares[ROOT], secret);
        // the inner gate's share is recoverable from any two of its children
        assert_eq!(interpolate_at_zero(&[(4, shares[4]), (6, shares[6])]), Some(shares[2]));
        assert_eq!(interpolate_at_zero(&[(1, shares[1]), (3, shares[3])]), Some(secret));
    }

    #[test]
    fn test_recover_secret_in_exponent() {
        let rng = &mut ChaCha20Rng::seed_from_u64(3);
        let tree = demo_tree();
        let base = pairing(random_g1(rng), random_g2(rng));
        let secret = random_scalar(rng);
        let shares = distribute_shares(&tree, secret, rng);

        for ids in [vec![1, 2, 4, 5], vec![1, 5], vec![2, 3, 5], vec![1, 3, 4], vec![1], vec![2, 5]] {
            let held: BTreeSet<AbeAttribute> = ids.iter().map(|id| AbeAttribute::new(*id)).collect();
            let recovered = recover_secret(&tree, |index, attribute| {
                held.contains(&attribute).then(|| base.pow(shares[index]))
            });

            if tree.is_satisfiable(&held) {
                assert_eq!(recovered, Some(base.pow(secret)), "attributes {:?}", ids);
            } else {
                assert_eq!(recovered, None, "attributes {:?}", ids);
            }
        }
    }
}
