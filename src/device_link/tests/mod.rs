mod impl_tty_test;
