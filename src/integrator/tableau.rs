use nalgebra::{DMatrix, DVector};

/// A butcher tableau for a Runge-Kutta method.
///
/// The tableau is defined by the matrices `a`, `b`, `c` and `d` and the order of the method.
/// The butchers tableau is often depicted like this example of a 3-stage method:
///
/// ```text
/// c1 | a11 0   0
/// c2 | a21 a22 0
/// c3 | a31 a32 a33
/// -------------------
///   | b1  b2  b3
///   | be1 be2 be3
/// -------------------
///   | d1  d2  d3
/// ```
///
/// where `be` is the embedded method for error control and `d` is the difference between the main and embedded method.
///
/// For continous extension methods, the beta matrix is also included.
///
#[derive(Clone, Debug)]
pub struct Tableau {
    a: DMatrix<f64>,
    b: DVector<f64>,
    c: DVector<f64>,
    d: DVector<f64>,
    order: usize,
    beta: Option<DMatrix<f64>>,
}

impl Tableau {
    /// Dormand-Prince 5(4) method
    /// from J. R. Dormand and P. J. Prince, A family of embedded Runge-Kutta formulae, J. Comp. Appl. Math. 6 (1980) 19-26.
    pub fn dopri5() -> Self {
        let c = DVector::from_vec(vec![0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
            0.0,
        ]);
        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(
            7,
            7,
            &[
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0, 0.0,
                19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0, 0.0, 0.0,
                9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0, 0.0, 0.0,
                b[0], b[1], b[2], b[3], b[4], b[5], 0.0,
            ],
        );
        let d = DVector::from_vec(vec![
            71.0 / 57600.0,
            0.0,
            -71.0 / 16695.0,
            71.0 / 1920.0,
            -17253.0 / 339200.0,
            22.0 / 525.0,
            -1.0 / 40.0,
        ]);

        // continuous extension of Shampine (1986), as in Hairer's DOPRI5:
        // b_i(theta) = b_i (3 theta^2 - 2 theta^3) + theta^2 (1 - theta)^2 e_i
        //            + theta (1 - theta)^2 [i = 0] - theta^2 (1 - theta) [i = 6]
        let e = [
            -12715105075.0 / 11282082432.0,
            0.0,
            87487479700.0 / 32700410799.0,
            -10690763975.0 / 1880347072.0,
            701980252875.0 / 199316789632.0,
            -1453857185.0 / 822651844.0,
            69997945.0 / 29380423.0,
        ];
        let mut beta = DMatrix::zeros(7, 4);
        for i in 0..7 {
            beta[(i, 1)] = 3.0 * b[i] + e[i];
            beta[(i, 2)] = -2.0 * b[i] - 2.0 * e[i];
            beta[(i, 3)] = e[i];
        }
        beta[(0, 0)] = 1.0;
        beta[(0, 1)] -= 2.0;
        beta[(0, 2)] += 1.0;
        beta[(6, 1)] -= 1.0;
        beta[(6, 2)] += 1.0;

        Self::new(a, b, c, d, 5, Some(beta))
    }

    /// Tsitouras 5(4) method
    /// from Ch. Tsitouras, Runge-Kutta pairs of order 5(4) satisfying only the first column simplifying assumption, Computers & Mathematics with Applications 62 (2011) 770-775.
    pub fn tsit45() -> Self {
        let c = DVector::from_vec(vec![
            0.0,
            0.161,
            0.327,
            0.9,
            0.9800255409045097,
            1.0,
            1.0,
        ]);

        let b = DVector::from_vec(vec![
            0.09646076681806523,
            0.01,
            0.4798896504144996,
            1.379008574103742,
            -3.290069515436081,
            2.324710524099774,
            0.0,
        ]);

        let d = DVector::from_vec(vec![
            -0.001_780_011_052_225_777,
            -0.0008164344596567469,
            0.007880878010261995,
            -0.1447110071732629,
            0.5823571654525552,
            -0.45808210592918697,
            0.015151515151515152,
        ]);

        let mut a = DMatrix::zeros(7, 7);
        a[(2, 1)] = 0.335_480_655_492_357;
        a[(3, 1)] = -6.359448489975075;
        a[(4, 1)] = -11.74888356406283;
        a[(5, 1)] = -12.92096931784711;
        a[(3, 2)] = 4.362295432869581;
        a[(4, 2)] = 7.495539342889836;
        a[(5, 2)] = 8.159367898576159;
        a[(4, 3)] = -0.09249506636175525;
        a[(5, 3)] = -0.071_584_973_281_401;
        a[(5, 4)] = -0.02826905039406838;
        for i in 1..7 {
            let a_sum: f64 = (1..i).map(|j| a[(i, j)]).sum();
            a[(i, 0)] = c[i] - a_sum;
        }
        for j in 0..6 {
            a[(6, j)] = b[j];
        }

        // continuous extension, b_i(theta) = sum_k beta[i, k] theta^(k + 1)
        #[rustfmt::skip]
        let beta = DMatrix::from_row_slice(
            7,
            4,
            &[
                1.0, -2.76370619727483, 2.91325546182191, -1.05308849772902,
                0.0, 0.1317, -0.2234, 0.1017,
                0.0, 3.93029623689475, -5.9410338721315, 2.49062728565125,
                0.0, -12.4110771669337, 30.3381886302823, -16.5481028892449,
                0.0, 37.509313416511, -88.1789048947664, 47.3795219628193,
                0.0, -27.8965262891973, 65.0918946747937, -34.8706578614966,
                0.0, 1.5, -4.0, 2.5,
            ],
        );

        Self::new(a, b, c, d, 4, Some(beta))
    }

    /// TR-BDF2 method
    /// from R.E. Bank, W.M. Coughran Jr, W. Fichtner, E.H. Grosse, D.J. Rose and R.K. Smith, Transient simulation of silicon devices and circuits, IEEE Trans. Comput.-Aided Design 4 (1985) 436-451.
    /// analysed in M.E. Hosea and L.F. Shampine. Analysis and implementation of TR-BDF2. Applied Numerical Mathematics, 20:21–37, 1996.
    ///
    /// continuous extension from :
    /// from Jørgensen, J. B., Kristensen, M. R., & Thomsen, P. G. (2018). A family of ESDIRK integration methods. arXiv preprint arXiv:1803.01613.
    pub fn tr_bdf2() -> Self {
        let gamma = 2.0 - 2.0_f64.sqrt();
        let d = gamma / 2.0;
        let w = 2.0_f64.sqrt() / 4.0;

        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.0, 0.0, 0.0,
                d, d, 0.0,
                w, w, d,
            ],
        );

        let b = DVector::from_vec(vec![w, w, d]);
        let b_hat = DVector::from_vec(vec![(1.0 - w) / 3.0, (3.0 * w + 1.0) / 3.0, d / 3.0]);
        let d = &b - &b_hat;

        #[rustfmt::skip]
        let beta = DMatrix::from_row_slice(
            3,
            2,
            &[
                2.0 * w, -w,
                2.0 * w, -w,
                gamma - 1.0, 2.0 * w,
            ],
        );

        let c = DVector::from_vec(vec![0.0, gamma, 1.0]);

        Self::new(a, b, c, d, 2, Some(beta))
    }

    /// A third order ESDIRK method
    /// from Jørgensen, J. B., Kristensen, M. R., & Thomsen, P. G. (2018). A family of ESDIRK integration methods. arXiv preprint arXiv:1803.01613.
    pub fn esdirk34() -> Self {
        let gamma = 0.435_866_521_508_459;
        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 0.0, 0.0, 0.0,
                gamma, gamma, 0.0, 0.0,
                0.140_737_774_724_706_2, -0.108_365_551_381_320_8, gamma, 0.0,
                0.102_399_400_619_911, -0.376_878_452_255_556_1, 0.838_612_530_127_186_1, gamma,
            ],
        );

        let b = a.row(3).transpose();

        let c = DVector::from_vec(vec![
            0.0,
            0.871_733_043_016_918,
            0.468_238_744_851_844_4,
            1.0,
        ]);

        let d = DVector::from_vec(vec![
            -0.054_625_497_240_413_94,
            -0.494_208_893_625_994_96,
            0.221_934_499_735_064_66,
            0.326_899_891_131_344_27,
        ]);

        Self::new(a, b, c, d, 3, None)
    }

    pub fn new(
        a: DMatrix<f64>,
        b: DVector<f64>,
        c: DVector<f64>,
        d: DVector<f64>,
        order: usize,
        beta: Option<DMatrix<f64>>,
    ) -> Self {
        let s = c.len();
        assert_eq!(a.ncols(), s, "Invalid number of rows in a, expected {s}");
        assert_eq!(a.nrows(), s, "Invalid number of columns in a, expected {s}",);
        assert_eq!(b.len(), s, "Invalid number of elements in b, expected {s}",);
        assert_eq!(d.len(), s, "Invalid number of elements in d, expected {s}",);
        if let Some(beta) = &beta {
            assert_eq!(
                beta.nrows(),
                s,
                "Invalid number of rows in beta, expected {s}",
            );
        }
        Self {
            a,
            b,
            c,
            d,
            order,
            beta,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn s(&self) -> usize {
        self.c.len()
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn c(&self) -> &DVector<f64> {
        &self.c
    }

    pub fn d(&self) -> &DVector<f64> {
        &self.d
    }

    pub fn beta(&self) -> Option<&DMatrix<f64>> {
        self.beta.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::Tableau;

    fn check_consistent(tableau: &Tableau) {
        let s = tableau.s();
        // row sums of a equal c
        for i in 0..s {
            let row_sum: f64 = tableau.a().row(i).iter().sum();
            assert!(
                (row_sum - tableau.c()[i]).abs() < 1e-10,
                "row {} sums to {} but c = {}",
                i,
                row_sum,
                tableau.c()[i]
            );
        }
        // weights sum to one, error weights to zero
        assert!((tableau.b().sum() - 1.0).abs() < 1e-10);
        assert!(tableau.d().sum().abs() < 1e-10);
        // continuous extension matches b at theta = 1
        if let Some(beta) = tableau.beta() {
            for i in 0..s {
                let b_at_one: f64 = beta.row(i).iter().sum();
                assert!((b_at_one - tableau.b()[i]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn tableaus_are_consistent() {
        for tableau in [
            Tableau::dopri5(),
            Tableau::tsit45(),
            Tableau::tr_bdf2(),
            Tableau::esdirk34(),
        ] {
            check_consistent(&tableau);
        }
    }

    #[test]
    fn dopri5_is_fifth_order() {
        // sum b_i c_i^4 = 1/5
        let tableau = Tableau::dopri5();
        let sum: f64 = (0..tableau.s())
            .map(|i| tableau.b()[i] * tableau.c()[i].powi(4))
            .sum();
        assert!((sum - 0.2).abs() < 1e-12);
        assert_eq!(tableau.order(), 5);
    }

    #[test]
    fn dopri5_continuous_extension_is_fourth_order() {
        // sum b_i(theta) c_i^k = theta^(k + 1) / (k + 1) for k < 4
        let tableau = Tableau::dopri5();
        let beta = tableau.beta().unwrap();
        for theta in [0.1_f64, 0.35, 0.5, 0.8] {
            let b_theta: Vec<f64> = (0..tableau.s())
                .map(|i| (0..4).map(|j| beta[(i, j)] * theta.powi(j as i32 + 1)).sum())
                .collect();
            for k in 0..4 {
                let sum: f64 = (0..tableau.s())
                    .map(|i| b_theta[i] * tableau.c()[i].powi(k))
                    .sum();
                let expected = theta.powi(k + 1) / (k + 1) as f64;
                assert!((sum - expected).abs() < 1e-12, "theta {theta}, k {k}");
            }
        }
    }
}
